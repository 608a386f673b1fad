use polyglot_types::LanguageCode;
use tracing::debug;
use whatlang::Lang;

/// Best-guess language of a text. Never fails: anything that cannot be
/// resolved comes back as [`LanguageCode::auto`].
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> LanguageCode;
}

/// Guesses below this whatlang confidence are treated as unresolved.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Trigram-based detection via `whatlang`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    pub fn new() -> Self {
        Self
    }

    /// ISO 639-1 code for the languages we map; `None` for the rest.
    fn lang_to_code(lang: Lang) -> Option<&'static str> {
        let code = match lang {
            Lang::Eng => "en",
            Lang::Fra => "fr",
            Lang::Spa => "es",
            Lang::Deu => "de",
            Lang::Ita => "it",
            Lang::Por => "pt",
            Lang::Rus => "ru",
            Lang::Jpn => "ja",
            Lang::Kor => "ko",
            Lang::Cmn => "zh",
            Lang::Ara => "ar",
            Lang::Nld => "nl",
            Lang::Pol => "pl",
            Lang::Tur => "tr",
            Lang::Swe => "sv",
            Lang::Ukr => "uk",
            Lang::Hin => "hi",
            Lang::Vie => "vi",
            Lang::Tha => "th",
            Lang::Heb => "he",
            Lang::Ell => "el",
            _ => return None,
        };
        Some(code)
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> LanguageCode {
        if text.trim().is_empty() {
            return LanguageCode::auto();
        }

        let Some(info) = whatlang::detect(text) else {
            debug!("Language detection found no script");
            return LanguageCode::auto();
        };

        if info.confidence() < MIN_CONFIDENCE {
            debug!(
                "Ambiguous detection {} (confidence {:.2})",
                info.lang().code(),
                info.confidence()
            );
            return LanguageCode::auto();
        }

        match Self::lang_to_code(info.lang()).map(LanguageCode::parse) {
            Some(Ok(code)) => {
                debug!("Detected {} (confidence {:.2})", code, info.confidence());
                code
            }
            _ => {
                debug!("Detected unmapped language {}", info.lang().code());
                LanguageCode::auto()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_languages() {
        let detector = WhatlangDetector::new();
        assert_eq!(
            detector
                .detect("This is a longer English sentence, written so that the detector has plenty of words to work with.")
                .as_str(),
            "en"
        );
        assert_eq!(
            detector
                .detect("Bonjour tout le monde, je suis très heureux de vous voir aujourd'hui dans cette belle ville.")
                .as_str(),
            "fr"
        );
    }

    #[test]
    fn blank_text_falls_back_to_auto() {
        let detector = WhatlangDetector::new();
        assert_eq!(detector.detect(""), LanguageCode::auto());
        assert_eq!(detector.detect("   \n"), LanguageCode::auto());
    }

    #[test]
    fn short_or_ambiguous_text_falls_back_to_auto() {
        let detector = WhatlangDetector::new();
        for word in ["chat", "gift"] {
            assert_eq!(detector.detect(word), LanguageCode::auto(), "{word}");
        }
    }
}
