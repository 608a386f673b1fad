use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target languages offered to users, in the order they are listed.
pub const SUPPORTED_TARGETS: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
    ("ar", "Arabic"),
    ("fr", "French"),
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid language code '{0}'")]
pub struct InvalidLanguageCode(pub String);

/// A two-letter language code, or one of the sentinels `auto` / `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub const AUTO: &'static str = "auto";
    pub const UNKNOWN: &'static str = "unknown";

    pub fn auto() -> Self {
        Self(Self::AUTO.to_string())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    /// Accepts two ASCII letters (case-insensitive) or a sentinel.
    pub fn parse(code: &str) -> Result<Self, InvalidLanguageCode> {
        let normalized = code.trim().to_ascii_lowercase();
        let is_pair = normalized.len() == 2 && normalized.bytes().all(|b| b.is_ascii_lowercase());
        if is_pair || normalized == Self::AUTO || normalized == Self::UNKNOWN {
            Ok(Self(normalized))
        } else {
            Err(InvalidLanguageCode(code.to_string()))
        }
    }

    /// Parses a code that must also be one of [`SUPPORTED_TARGETS`].
    pub fn target(code: &str) -> Result<Self, InvalidLanguageCode> {
        let parsed = Self::parse(code)?;
        if parsed.is_supported_target() {
            Ok(parsed)
        } else {
            Err(InvalidLanguageCode(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// False for the `auto` and `unknown` sentinels.
    pub fn is_resolved(&self) -> bool {
        self.0 != Self::AUTO && self.0 != Self::UNKNOWN
    }

    pub fn is_supported_target(&self) -> bool {
        SUPPORTED_TARGETS.iter().any(|(code, _)| *code == self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = InvalidLanguageCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

/// Display name for a code; unknown codes are shown uppercased.
pub fn language_name(code: &str) -> String {
    if code == LanguageCode::AUTO {
        return "Auto-detected".to_string();
    }
    SUPPORTED_TARGETS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_uppercase())
}
