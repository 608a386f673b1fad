//! The translation request pipeline: validate the input, extract text,
//! detect the source language, translate, then persist the record (and, for
//! uploads, the translated output file).

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use polyglot_db::{Database, NewTranslation, TranslationRow};
use polyglot_translate::{LanguageDetector, Translator};
use polyglot_types::{LanguageCode, Translation, TranslationType};

use crate::error::{ApiError, blocking};
use crate::storage::{
    ArtifactStore, extension, has_allowed_extension, output_artifact_name, sanitize_filename,
};

/// 16 MB upload limit
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["txt", "json"];

/// Raw payload of one translation request.
#[derive(Debug)]
pub enum TranslationInput {
    Text(String),
    /// Transcript produced client-side by speech recognition.
    Voice(String),
    File { filename: String, bytes: Vec<u8> },
}

impl TranslationInput {
    pub fn kind(&self) -> TranslationType {
        match self {
            Self::Text(_) => TranslationType::Text,
            Self::Voice(_) => TranslationType::Voice,
            Self::File { .. } => TranslationType::File,
        }
    }
}

/// A finished run: the stored record and, for uploads, the output artifact.
#[derive(Debug)]
pub struct Completed {
    pub translation: Translation,
    pub artifact: Option<String>,
}

enum Content {
    Plain(String),
    Json(Value),
}

#[derive(Clone)]
pub struct Pipeline {
    db: Arc<Database>,
    uploads: Arc<ArtifactStore>,
    detector: Arc<dyn LanguageDetector>,
    translator: Translator,
}

impl Pipeline {
    pub fn new(
        db: Arc<Database>,
        uploads: Arc<ArtifactStore>,
        detector: Arc<dyn LanguageDetector>,
        translator: Translator,
    ) -> Self {
        Self {
            db,
            uploads,
            detector,
            translator,
        }
    }

    pub async fn run(
        &self,
        user_id: i64,
        target_language: &str,
        input: TranslationInput,
    ) -> Result<Completed, ApiError> {
        let target = LanguageCode::target(target_language).map_err(|_| {
            ApiError::Validation(format!("unsupported target language '{target_language}'"))
        })?;

        match input {
            TranslationInput::Text(text) => {
                self.run_text(user_id, target, TranslationType::Text, text).await
            }
            TranslationInput::Voice(transcript) => {
                self.run_text(user_id, target, TranslationType::Voice, transcript).await
            }
            TranslationInput::File { filename, bytes } => {
                self.run_file(user_id, target, &filename, &bytes).await
            }
        }
    }

    async fn run_text(
        &self,
        user_id: i64,
        target: LanguageCode,
        kind: TranslationType,
        text: String,
    ) -> Result<Completed, ApiError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ApiError::Validation("text to translate is required".into()));
        }

        let source = self.detect(&text).await?;
        let translated = self
            .translator
            .translate(&text, &source, &target)
            .await
            .into_result()
            .map_err(ApiError::TranslationService)?;

        let row = self
            .persist(NewTranslation {
                user_id,
                original_text: text,
                translated_text: translated,
                source_language: source,
                target_language: target,
                translation_type: kind,
                filename: None,
            })
            .await?;

        let translation: Translation = row.try_into()?;
        Ok(Completed {
            translation,
            artifact: None,
        })
    }

    async fn run_file(
        &self,
        user_id: i64,
        target: LanguageCode,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Completed, ApiError> {
        let sanitized = validate_upload(filename, bytes)?;
        let stored = self.uploads.save_new("", &sanitized, Utc::now(), bytes).await?;
        info!("User {} uploaded {} ({} bytes)", user_id, stored, bytes.len());

        match self.translate_upload(user_id, &target, &stored, bytes).await {
            Ok(done) => Ok(done),
            Err(e) => {
                if let Err(cleanup) = self.uploads.delete(&stored).await {
                    error!("Failed to remove upload {}: {:#}", stored, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn translate_upload(
        &self,
        user_id: i64,
        target: &LanguageCode,
        stored: &str,
        bytes: &[u8],
    ) -> Result<Completed, ApiError> {
        let content = extract(stored, bytes)?;
        let original_text = match &content {
            Content::Plain(text) => text.clone(),
            Content::Json(doc) => serde_json::to_string_pretty(doc).map_err(anyhow::Error::from)?,
        };

        let source = self.detect(&original_text).await?;
        let translated_text = match &content {
            Content::Plain(text) => self
                .translator
                .translate(text, &source, target)
                .await
                .into_result()
                .map_err(ApiError::TranslationService)?,
            Content::Json(doc) => {
                let translated = self
                    .translator
                    .translate_json(doc, &source, target)
                    .await
                    .into_result()
                    .map_err(ApiError::TranslationService)?;
                serde_json::to_string_pretty(&translated).map_err(anyhow::Error::from)?
            }
        };

        let row = self
            .persist(NewTranslation {
                user_id,
                original_text,
                translated_text: translated_text.clone(),
                source_language: source,
                target_language: target.clone(),
                translation_type: TranslationType::File,
                filename: Some(stored.to_string()),
            })
            .await?;

        let artifact = output_artifact_name(row.id, stored);
        if let Err(e) = self
            .write_artifact(row.id, user_id, &artifact, translated_text.as_bytes())
            .await
        {
            warn!("Rolling back translation {} after artifact failure", row.id);
            let db = self.db.clone();
            let id = row.id;
            if let Err(cleanup) = blocking(move || db.delete_translation(id, user_id)).await {
                error!("Failed to roll back translation {}: {}", id, cleanup);
            }
            self.uploads.delete(&artifact).await.ok();
            return Err(e);
        }

        let translation: Translation = row.try_into()?;
        Ok(Completed {
            translation,
            artifact: Some(artifact),
        })
    }

    async fn write_artifact(
        &self,
        id: i64,
        user_id: i64,
        artifact: &str,
        body: &[u8],
    ) -> Result<(), ApiError> {
        self.uploads.write(artifact, body).await?;
        let db = self.db.clone();
        let name = artifact.to_string();
        blocking(move || db.set_artifact(id, user_id, &name)).await
    }

    /// Detection is CPU-bound on large files, so it runs off the runtime.
    async fn detect(&self, text: &str) -> Result<LanguageCode, ApiError> {
        let detector = self.detector.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || detector.detect(&text))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.into())
            })
    }

    async fn persist(&self, new: NewTranslation) -> Result<TranslationRow, ApiError> {
        let db = self.db.clone();
        blocking(move || db.create_translation(&new)).await
    }
}

/// Checks size and extension; returns the sanitized filename.
pub fn validate_upload(filename: &str, bytes: &[u8]) -> Result<String, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::Validation("the uploaded file is empty".into()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge(MAX_UPLOAD_BYTES));
    }

    let sanitized = sanitize_filename(filename);
    if !has_allowed_extension(&sanitized, ALLOWED_UPLOAD_EXTENSIONS) {
        return Err(ApiError::Validation(
            "only .txt and .json files are accepted".into(),
        ));
    }
    Ok(sanitized)
}

fn extract(stored: &str, bytes: &[u8]) -> Result<Content, ApiError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ApiError::Decode("the file is not valid UTF-8 text".into()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if text.trim().is_empty() {
        return Err(ApiError::Validation("the uploaded file is empty".into()));
    }

    if extension(stored).as_deref() == Some("json") {
        let doc: Value = serde_json::from_str(text)
            .map_err(|e| ApiError::Decode(format!("the file is not valid JSON: {e}")))?;
        Ok(Content::Json(doc))
    } else {
        Ok(Content::Plain(text.to_string()))
    }
}
