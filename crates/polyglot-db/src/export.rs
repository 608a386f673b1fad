use anyhow::Context;

use crate::models::TranslationRow;
use crate::{Database, StoreResult, parse_timestamp};

pub const CSV_HEADER: [&str; 7] = [
    "Date",
    "Type",
    "SourceLanguage",
    "TargetLanguage",
    "OriginalTextTruncated",
    "TranslatedTextTruncated",
    "Filename",
];

/// Text columns are cut to this many characters in exports.
pub const EXPORT_TEXT_LIMIT: usize = 100;

impl Database {
    /// Serializes all of an owner's records, newest first.
    pub fn export_csv(&self, owner_id: i64) -> StoreResult<String> {
        let rows = self.all_translations(owner_id)?;
        Ok(write_csv(&rows)?)
    }
}

pub fn write_csv(rows: &[TranslationRow]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    wtr.write_record(CSV_HEADER)
        .context("Failed to write CSV header")?;

    for row in rows {
        let date = parse_timestamp(&row.created_at)?
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        wtr.write_record([
            date.as_str(),
            row.translation_type.as_str(),
            row.source_language.as_str(),
            row.target_language.as_str(),
            truncate(&row.original_text, EXPORT_TEXT_LIMIT).as_str(),
            truncate(&row.translated_text, EXPORT_TEXT_LIMIT).as_str(),
            row.filename.as_deref().unwrap_or(""),
        ])
        .with_context(|| format!("Failed to write CSV record for translation {}", row.id))?;
    }

    let bytes = wtr.into_inner().context("Failed to flush CSV writer")?;
    Ok(String::from_utf8(bytes)?)
}

/// Keeps the first `limit` characters and marks the cut with `...`.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
