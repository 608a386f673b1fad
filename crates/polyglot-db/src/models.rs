//! Row types that map directly to SQLite rows.
//! Distinct from polyglot-types models to keep the DB layer independent.

use anyhow::{Context, Result};
use polyglot_types::{LanguageCode, Translation, TranslationType, User};

use crate::parse_timestamp;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_photo: String,
    pub created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            created_at: parse_timestamp(&row.created_at)
                .with_context(|| format!("corrupt created_at on user {}", row.id))?,
            username: row.username,
            email: row.email,
            profile_photo: row.profile_photo,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TranslationRow {
    pub id: i64,
    pub user_id: i64,
    pub original_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub translation_type: String,
    pub filename: Option<String>,
    pub artifact: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<TranslationRow> for Translation {
    type Error = anyhow::Error;

    fn try_from(row: TranslationRow) -> Result<Self> {
        let id = row.id;
        Ok(Translation {
            id,
            user_id: row.user_id,
            source_language: LanguageCode::parse(&row.source_language)
                .with_context(|| format!("corrupt source_language on translation {id}"))?,
            target_language: LanguageCode::parse(&row.target_language)
                .with_context(|| format!("corrupt target_language on translation {id}"))?,
            translation_type: row
                .translation_type
                .parse::<TranslationType>()
                .with_context(|| format!("corrupt translation_type on translation {id}"))?,
            created_at: parse_timestamp(&row.created_at)
                .with_context(|| format!("corrupt created_at on translation {id}"))?,
            updated_at: parse_timestamp(&row.updated_at)
                .with_context(|| format!("corrupt updated_at on translation {id}"))?,
            original_text: row.original_text,
            translated_text: row.translated_text,
            filename: row.filename,
        })
    }
}

/// Fields supplied by the pipeline when a run completes.
#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub user_id: i64,
    pub original_text: String,
    pub translated_text: String,
    pub source_language: LanguageCode,
    pub target_language: LanguageCode,
    pub translation_type: TranslationType,
    pub filename: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub user_id: i64,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.per_page) < self.total
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationStats {
    pub total: u64,
    pub voice_count: u64,
    pub text_count: u64,
    pub file_count: u64,
    /// At most three `(target_language, count)` pairs, most frequent first,
    /// ties broken by code ascending.
    pub top_languages: Vec<(String, u64)>,
}

impl TranslationStats {
    pub fn count_for(&self, kind: TranslationType) -> u64 {
        match kind {
            TranslationType::Voice => self.voice_count,
            TranslationType::Text => self.text_count,
            TranslationType::File => self.file_count,
        }
    }

    /// Share of `kind` in percent, floored to one decimal so the three shares
    /// never add up past 100. Zero when there are no translations.
    pub fn percentage(&self, kind: TranslationType) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let ratio = self.count_for(kind) as f64 / self.total as f64;
        (ratio * 1000.0).floor() / 10.0
    }
}
