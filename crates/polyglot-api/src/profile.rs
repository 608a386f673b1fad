use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, info};

use polyglot_types::User;
use polyglot_types::api::{Claims, ProfileResponse, UpdateProfileRequest};
use polyglot_types::models::DEFAULT_AVATAR;

use crate::auth::{AppState, hash_password, validate_new_password, validate_username, verify_password};
use crate::error::{ApiError, blocking};
use crate::form::UploadForm;
use crate::storage::{extension, has_allowed_extension, sanitize_filename};

pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// GET /profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let row = blocking(move || db.get_user(claims.sub))
        .await?
        .ok_or(ApiError::NotFound)?;
    let user: ProfileResponse = row.try_into()?;
    Ok(Json(user))
}

/// PUT /profile. A password change needs the current password.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    validate_username(&username)?;

    let new_hash = match req.new_password.as_deref().filter(|p| !p.is_empty()) {
        Some(new_password) => {
            let db = state.db.clone();
            let current = blocking(move || db.get_user(claims.sub))
                .await?
                .ok_or(ApiError::NotFound)?;
            let supplied = req.current_password.as_deref().unwrap_or_default();
            if !verify_password(supplied, &current.password_hash) {
                return Err(ApiError::Validation("current password is incorrect".into()));
            }
            validate_new_password(new_password, req.confirm_password.as_deref().unwrap_or_default())?;
            Some(hash_password(new_password)?)
        }
        None => None,
    };

    let db = state.db.clone();
    let user_id = claims.sub;
    let row = blocking(move || db.update_profile(user_id, &username, new_hash.as_deref())).await?;

    let user: User = row.try_into()?;
    Ok(Json(user))
}

/// POST /profile/photo, multipart with a `photo` part.
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = UploadForm::read(multipart, "photo").await?;
    let (filename, bytes) = form.take_file()?;

    if bytes.is_empty() {
        return Err(ApiError::Validation("the uploaded photo is empty".into()));
    }
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(ApiError::PayloadTooLarge(MAX_PHOTO_BYTES));
    }
    let sanitized = sanitize_filename(&filename);
    if !has_allowed_extension(&sanitized, PHOTO_EXTENSIONS) {
        return Err(ApiError::Validation(
            "profile photos must be jpg, jpeg, png or gif".into(),
        ));
    }

    let user_id = claims.sub;
    let stored = state
        .photos
        .save_new(&format!("{user_id}_"), &sanitized, Utc::now(), &bytes)
        .await?;

    let db = state.db.clone();
    let photo = stored.clone();
    let previous = match blocking(move || db.update_profile_photo(user_id, &photo)).await {
        Ok(previous) => previous,
        Err(e) => {
            state.photos.delete(&stored).await.ok();
            return Err(e);
        }
    };

    if previous != DEFAULT_AVATAR && previous != stored {
        if let Err(e) = state.photos.delete(&previous).await {
            error!("Failed to remove old photo {}: {:#}", previous, e);
        }
    }

    info!("User {} set profile photo {}", user_id, stored);
    let db = state.db.clone();
    let row = blocking(move || db.get_user(user_id))
        .await?
        .ok_or(ApiError::NotFound)?;
    let user: User = row.try_into()?;
    Ok(Json(user))
}

/// GET /profile/photo. 404 while the default avatar is in use.
pub async fn get_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let row = blocking(move || db.get_user(claims.sub))
        .await?
        .ok_or(ApiError::NotFound)?;
    if row.profile_photo == DEFAULT_AVATAR {
        return Err(ApiError::NotFound);
    }

    let bytes = state
        .photos
        .read(&row.profile_photo)
        .await?
        .ok_or(ApiError::NotFound)?;

    let content_type = match extension(&row.profile_photo).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
