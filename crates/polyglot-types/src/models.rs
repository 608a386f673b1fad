use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::language::LanguageCode;

/// Sentinel photo filename for accounts that never uploaded one.
pub const DEFAULT_AVATAR: &str = "default_avatar.png";

/// Public view of an account. The password digest never leaves the DB layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub profile_photo: String,
    pub created_at: DateTime<Utc>,
}

/// Channel a translation request arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationType {
    Voice,
    Text,
    File,
}

impl TranslationType {
    pub const ALL: [TranslationType; 3] = [Self::Voice, Self::Text, Self::File];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Text => "text",
            Self::File => "file",
        }
    }
}

impl fmt::Display for TranslationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown translation type '{0}'")]
pub struct UnknownTranslationType(pub String);

impl FromStr for TranslationType {
    type Err = UnknownTranslationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(Self::Voice),
            "text" => Ok(Self::Text),
            "file" => Ok(Self::File),
            other => Err(UnknownTranslationType(other.to_string())),
        }
    }
}

/// A stored translation, owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub id: i64,
    pub user_id: i64,
    pub original_text: String,
    pub translated_text: String,
    pub source_language: LanguageCode,
    pub target_language: LanguageCode,
    pub translation_type: TranslationType,
    /// Stored upload name, file translations only.
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_type_round_trips_through_str() {
        for kind in TranslationType::ALL {
            assert_eq!(kind.as_str().parse::<TranslationType>().unwrap(), kind);
        }
        assert!("audio".parse::<TranslationType>().is_err());
    }

    #[test]
    fn translation_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TranslationType::Voice).unwrap(), "\"voice\"");
    }
}
