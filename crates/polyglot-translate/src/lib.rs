//! Collaborators the translation pipeline calls through narrow contracts:
//! a language detector and a translation backend.

pub mod detector;
pub mod libre;
pub mod translator;

pub use detector::{LanguageDetector, WhatlangDetector};
pub use libre::{LibreTranslate, LibreTranslateConfig};
pub use translator::{TranslationBackend, TranslationOutcome, Translator};
