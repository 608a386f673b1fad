use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use polyglot_db::Database;
use polyglot_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, blocking};
use crate::pipeline::Pipeline;
use crate::storage::ArtifactStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub pipeline: Pipeline,
    pub uploads: Arc<ArtifactStore>,
    pub photos: Arc<ArtifactStore>,
    pub jwt_secret: String,
    pub session_ttl: Duration,
}

pub const MIN_PASSWORD_LEN: usize = 6;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    validate_username(&username)?;
    if !looks_like_email(&email) {
        return Err(ApiError::Validation("a valid email address is required".into()));
    }
    validate_new_password(&req.password, &req.confirm_password)?;

    let password_hash = hash_password(&req.password)?;

    let db = state.db.clone();
    let user = blocking(move || db.create_user(&username, &email, &password_hash)).await?;

    info!("Registered user {}", user.id);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            username: user.username,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let username = req.username.trim().to_string();
    let user = blocking(move || db.find_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&req.password, &user.password_hash) {
        warn!("Failed login for user {}", user.id);
        return Err(ApiError::Unauthorized);
    }

    let session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + state.session_ttl;

    let db = state.db.clone();
    let sid = session_id.clone();
    let user_id = user.id;
    blocking(move || db.create_session(&sid, user_id, expires_at)).await?;

    let token = create_token(&state.jwt_secret, user.id, &user.username, &session_id, expires_at)?;

    info!("User {} logged in", user.id);
    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        token,
        expires_at,
    }))
}

/// Revokes the session behind the presented token.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let jti = claims.jti.clone();
    blocking(move || db.delete_session(&jti)).await?;

    info!("User {} logged out", claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        warn!("Stored password hash is not in PHC format");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(3..=64).contains(&len) {
        return Err(ApiError::Validation(
            "username must be between 3 and 64 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password != confirmation {
        return Err(ApiError::Validation("passwords do not match".into()));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

pub fn create_token(
    secret: &str,
    user_id: i64,
    username: &str,
    session_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        jti: session_id.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}
