use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use polyglot_db::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can report. Messages are written for the end user;
/// internal details are logged, never returned.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Decode(String),

    #[error("not found")]
    NotFound,

    /// Carries the collaborator's reason for the log only.
    #[error("the translation service is unavailable, please try again later")]
    TranslationService(String),

    #[error("this {field} is already registered")]
    Duplicate { field: &'static str },

    #[error("authentication required")]
    Unauthorized,

    #[error("upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::TranslationService(_) => StatusCode::BAD_GATEWAY,
            Self::Duplicate { .. } => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::Validation(msg) => Self::Validation(msg),
            StoreError::Duplicate { field } => Self::Duplicate { field },
            StoreError::Internal(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => error!("Internal error: {:#}", e),
            Self::TranslationService(reason) => error!("Translation service failure: {}", reason),
            _ => {}
        }

        let body = match &self {
            Self::Duplicate { field } => json!({ "error": self.to_string(), "field": field }),
            _ => json!({ "error": self.to_string() }),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Runs blocking store work off the async runtime.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::from)
}
