use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

pub use polyglot_types::api::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// Validates the bearer token and the live session it names, then exposes
/// the claims to handlers as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;
    let claims = token_data.claims;

    let db = state.db.clone();
    let jti = claims.jti.clone();
    let session = blocking(move || db.get_live_session(&jti)).await?;
    match session {
        Some(session) if session.user_id == claims.sub => {}
        _ => return Err(ApiError::Unauthorized),
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
