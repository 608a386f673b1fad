use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use polyglot_types::SUPPORTED_TARGETS;
use polyglot_types::api::{
    Claims, LanguageInfo, TextTranslationRequest, TranslationResponse, VoiceTranslationRequest,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::form::UploadForm;
use crate::pipeline::{Completed, TranslationInput};

/// GET /languages
pub async fn list_languages() -> Json<Vec<LanguageInfo>> {
    Json(
        SUPPORTED_TARGETS
            .iter()
            .map(|&(code, name)| LanguageInfo { code, name })
            .collect(),
    )
}

/// POST /translations/text
pub async fn translate_text(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TextTranslationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let done = state
        .pipeline
        .run(claims.sub, &req.target_language, TranslationInput::Text(req.text))
        .await?;
    Ok(created(done))
}

/// POST /translations/voice
pub async fn translate_voice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VoiceTranslationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let done = state
        .pipeline
        .run(claims.sub, &req.target_language, TranslationInput::Voice(req.transcript))
        .await?;
    Ok(created(done))
}

/// POST /translations/file, multipart with a `file` part and a
/// `target_language` field.
pub async fn translate_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = UploadForm::read(multipart, "file").await?;
    let (filename, bytes) = form.take_file()?;
    let target = form.field("target_language")?.to_string();

    let done = state
        .pipeline
        .run(claims.sub, &target, TranslationInput::File { filename, bytes })
        .await?;
    Ok(created(done))
}

fn created(done: Completed) -> (StatusCode, Json<TranslationResponse>) {
    let t = &done.translation;
    info!(
        "Translation {} ({}) {} -> {} for user {}",
        t.id, t.translation_type, t.source_language, t.target_language, t.user_id
    );
    (
        StatusCode::CREATED,
        Json(TranslationResponse {
            translation: done.translation,
            download: done.artifact,
        }),
    )
}
