use std::sync::Arc;

use async_trait::async_trait;
use polyglot_types::LanguageCode;
use serde_json::Value;
use tracing::warn;

/// A remote (or fake) service that turns text from one language into another.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> anyhow::Result<String>;
}

/// Result of a translation call. Service errors are reported here instead of
/// being mixed into the translated content.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutcome<T = String> {
    Translated(T),
    ServiceFailure(String),
}

impl<T> TranslationOutcome<T> {
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Translated(value) => Ok(value),
            Self::ServiceFailure(reason) => Err(reason),
        }
    }
}

/// Front for a [`TranslationBackend`] that short-circuits same-language
/// requests and never propagates an error to the caller.
#[derive(Clone)]
pub struct Translator {
    backend: Arc<dyn TranslationBackend>,
}

impl Translator {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    pub async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> TranslationOutcome {
        if source == target {
            return TranslationOutcome::Translated(text.to_string());
        }

        match self.backend.translate(text, source, target).await {
            Ok(translated) => TranslationOutcome::Translated(translated),
            Err(e) => {
                warn!("Translation {} -> {} failed: {:#}", source, target, e);
                TranslationOutcome::ServiceFailure(format!("translation service error: {e:#}"))
            }
        }
    }

    /// Translates every string value of a JSON document. Keys, numbers,
    /// booleans, nulls and the nesting are left as they are.
    pub async fn translate_json(
        &self,
        document: &Value,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> TranslationOutcome<Value> {
        if source == target {
            return TranslationOutcome::Translated(document.clone());
        }

        let mut leaves = Vec::new();
        collect_strings(document, &mut leaves);

        let mut translated = Vec::with_capacity(leaves.len());
        for leaf in &leaves {
            if leaf.trim().is_empty() {
                translated.push(leaf.clone());
                continue;
            }
            match self.translate(leaf, source, target).await {
                TranslationOutcome::Translated(text) => translated.push(text),
                TranslationOutcome::ServiceFailure(reason) => {
                    return TranslationOutcome::ServiceFailure(reason);
                }
            }
        }

        let mut output = document.clone();
        replace_strings(&mut output, &mut translated.into_iter());
        TranslationOutcome::Translated(output)
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Walks in the same order as [`collect_strings`].
fn replace_strings(value: &mut Value, replacements: &mut impl Iterator<Item = String>) {
    match value {
        Value::String(s) => {
            if let Some(next) = replacements.next() {
                *s = next;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| replace_strings(item, replacements)),
        Value::Object(map) => map.values_mut().for_each(|item| replace_strings(item, replacements)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Uppercases the text and counts calls.
    #[derive(Default)]
    struct Shouting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationBackend for Shouting {
        async fn translate(&self, text: &str, _: &LanguageCode, _: &LanguageCode) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.to_uppercase())
        }
    }

    struct Offline;

    #[async_trait]
    impl TranslationBackend for Offline {
        async fn translate(&self, _: &str, _: &LanguageCode, _: &LanguageCode) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    fn code(c: &str) -> LanguageCode {
        LanguageCode::parse(c).unwrap()
    }

    #[tokio::test]
    async fn same_language_skips_the_backend() {
        let backend = Arc::new(Shouting::default());
        let translator = Translator::new(backend.clone());

        for text in ["hello", "", "ünïcödé 文字"] {
            let outcome = translator.translate(text, &code("en"), &code("en")).await;
            assert_eq!(outcome, TranslationOutcome::Translated(text.to_string()));
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn different_languages_call_the_backend() {
        let backend = Arc::new(Shouting::default());
        let translator = Translator::new(backend.clone());

        let outcome = translator.translate("hello", &LanguageCode::auto(), &code("fr")).await;
        assert_eq!(outcome, TranslationOutcome::Translated("HELLO".to_string()));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_errors_become_service_failures() {
        let translator = Translator::new(Arc::new(Offline));
        let outcome = translator.translate("hello", &code("en"), &code("fr")).await;
        match outcome {
            TranslationOutcome::ServiceFailure(reason) => assert!(reason.contains("connection refused")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn json_keeps_structure_and_translates_values() {
        let translator = Translator::new(Arc::new(Shouting::default()));
        let doc = json!({
            "greeting": "bonjour",
            "count": 3,
            "nested": { "items": ["un", "deux", null, true], "empty": "" }
        });

        let out = translator
            .translate_json(&doc, &code("fr"), &code("en"))
            .await
            .into_result()
            .unwrap();

        assert_eq!(
            out,
            json!({
                "greeting": "BONJOUR",
                "count": 3,
                "nested": { "items": ["UN", "DEUX", null, true], "empty": "" }
            })
        );
    }

    #[tokio::test]
    async fn json_failure_aborts_the_document() {
        let translator = Translator::new(Arc::new(Offline));
        let outcome = translator
            .translate_json(&json!({"greeting": "bonjour"}), &code("fr"), &code("en"))
            .await;
        assert!(outcome.into_result().is_err());
    }
}
