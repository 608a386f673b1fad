pub mod api;
pub mod language;
pub mod models;

pub use language::{LanguageCode, SUPPORTED_TARGETS, language_name};
pub use models::{Translation, TranslationType, User};
