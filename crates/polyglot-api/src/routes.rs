use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};

use crate::auth::{self, AppState};
use crate::files;
use crate::history;
use crate::middleware::require_auth;
use crate::pipeline::MAX_UPLOAD_BYTES;
use crate::profile;
use crate::translations;

/// Room for the multipart framing around a maximum-size upload.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/languages", get(translations::list_languages))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/profile/photo", get(profile::get_photo).post(profile::upload_photo))
        .route("/translations/text", post(translations::translate_text))
        .route("/translations/voice", post(translations::translate_voice))
        .route("/translations/file", post(translations::translate_file))
        .route("/history", get(history::list_history))
        .route("/history/export", get(history::export_history))
        .route(
            "/history/{id}",
            put(history::edit_translation).delete(history::delete_translation),
        )
        .route("/statistics", get(history::statistics))
        .route("/files/{name}", get(files::download_file))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD))
}

async fn health() -> &'static str {
    "ok"
}
