use axum::{
    Extension,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use tracing::warn;

use polyglot_types::api::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::storage::{extension, is_safe_name};

/// GET /files/{name}, downloads a translated output owned by the caller.
/// Anything else, including other users' outputs, is a 404.
pub async fn download_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_safe_name(&name) {
        return Err(ApiError::NotFound);
    }

    let db = state.db.clone();
    let owner = claims.sub;
    let artifact = name.clone();
    if !blocking(move || db.owns_artifact(owner, &artifact)).await? {
        return Err(ApiError::NotFound);
    }

    let Some(bytes) = state.uploads.read(&name).await? else {
        warn!("Artifact {} is recorded but missing on disk", name);
        return Err(ApiError::NotFound);
    };

    let content_type = match extension(&name).as_deref() {
        Some("json") => "application/json",
        _ => "text/plain; charset=utf-8",
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename={name}")),
        ],
        bytes,
    ))
}
