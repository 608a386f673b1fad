use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, info};

use polyglot_types::api::{
    Claims, EditTranslationRequest, HistoryPage, LanguageCount, StatisticsResponse,
};
use polyglot_types::{Translation, TranslationType, language_name};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::storage::sanitize_filename;

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;
pub const RECENT_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /history?page=&per_page=, newest first.
pub async fn list_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);

    let db = state.db.clone();
    let owner = claims.sub;
    let rows = blocking(move || db.list_translations(owner, page, per_page)).await?;

    let has_next = rows.has_next();
    let items = rows
        .items
        .into_iter()
        .map(Translation::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(HistoryPage {
        items,
        page: rows.page,
        per_page: rows.per_page,
        total: rows.total,
        has_next,
    }))
}

/// PUT /history/{id}, replaces the translated text.
pub async fn edit_translation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<EditTranslationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let owner = claims.sub;
    let row = blocking(move || db.update_translation(id, owner, &req.translated_text)).await?;

    info!("User {} edited translation {}", owner, id);
    let translation: Translation = row.try_into()?;
    Ok(Json(translation))
}

/// DELETE /history/{id}. The upload and its translated output go with it.
pub async fn delete_translation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let owner = claims.sub;
    let row = blocking(move || db.delete_translation(id, owner)).await?;

    for name in [row.artifact.as_deref(), row.filename.as_deref()].into_iter().flatten() {
        if let Err(e) = state.uploads.delete(name).await {
            error!("Failed to remove {} for translation {}: {:#}", name, id, e);
        }
    }

    info!("User {} deleted translation {}", owner, id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /history/export, the caller's whole history as a CSV attachment.
pub async fn export_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let owner = claims.sub;
    let (user, csv) = blocking(move || {
        let user = db.get_user(owner)?;
        let csv = db.export_csv(owner)?;
        Ok((user, csv))
    })
    .await?;
    let user = user.ok_or(ApiError::NotFound)?;

    let mut stem = sanitize_filename(&user.username);
    if stem.is_empty() {
        stem = format!("user_{}", user.id);
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=translation_history_{stem}.csv"),
            ),
        ],
        csv,
    ))
}

/// GET /statistics
pub async fn statistics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let owner = claims.sub;
    let (stats, recent) = blocking(move || {
        let stats = db.translation_stats(owner)?;
        let recent = db.recent_translations(owner, RECENT_LIMIT)?;
        Ok((stats, recent))
    })
    .await?;

    let recent = recent
        .into_iter()
        .map(Translation::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let top_languages = stats
        .top_languages
        .iter()
        .map(|(code, count)| LanguageCount {
            code: code.clone(),
            name: language_name(code),
            count: *count,
        })
        .collect();

    Ok(Json(StatisticsResponse {
        total: stats.total,
        voice_count: stats.voice_count,
        text_count: stats.text_count,
        file_count: stats.file_count,
        voice_percentage: stats.percentage(TranslationType::Voice),
        text_percentage: stats.percentage(TranslationType::Text),
        file_percentage: stats.percentage(TranslationType::File),
        top_languages,
        recent,
    }))
}
