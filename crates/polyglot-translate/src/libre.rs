use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use polyglot_types::LanguageCode;
use serde::Deserialize;
use tracing::debug;

use crate::translator::TranslationBackend;

#[derive(Debug, Clone)]
pub struct LibreTranslateConfig {
    /// Base URL, e.g. `http://localhost:5000`.
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for LibreTranslateConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            api_key: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Client for a LibreTranslate server's `POST /translate` endpoint.
pub struct LibreTranslate {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibreTranslateResponse {
    translated_text: String,
}

impl LibreTranslate {
    pub fn new(config: LibreTranslateConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl TranslationBackend for LibreTranslate {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> anyhow::Result<String> {
        // LibreTranslate only understands "auto" for an unresolved source.
        let source = if source.is_resolved() { source.as_str() } else { LanguageCode::AUTO };

        let mut body = serde_json::json!({
            "q": text,
            "source": source,
            "target": target.as_str(),
            "format": "text",
        });
        if let Some(api_key) = &self.api_key {
            body["api_key"] = serde_json::Value::String(api_key.clone());
        }

        debug!("LibreTranslate {} -> {} ({} chars)", source, target, text.chars().count());

        let response = self
            .client
            .post(format!("{}/translate", self.url))
            .json(&body)
            .send()
            .await
            .context("LibreTranslate request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("LibreTranslate API error: {status} - {body}");
        }

        let parsed: LibreTranslateResponse = response
            .json()
            .await
            .context("Failed to parse LibreTranslate response")?;

        Ok(parsed.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(url: String, api_key: Option<&str>) -> LibreTranslate {
        LibreTranslate::new(LibreTranslateConfig {
            url,
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_languages_and_reads_translation() {
        let app = Router::new().route(
            "/translate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["source"], "fr");
                assert_eq!(body["target"], "en");
                assert_eq!(body["api_key"], "secret");
                let reply = if body["q"] == "Bonjour le monde" { "Hello world" } else { "?" };
                Json(json!({ "translatedText": reply }))
            }),
        );
        let url = serve(app).await;

        let translated = client(url, Some("secret"))
            .translate(
                "Bonjour le monde",
                &LanguageCode::parse("fr").unwrap(),
                &LanguageCode::parse("en").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(translated, "Hello world");
    }

    #[tokio::test]
    async fn unresolved_source_is_sent_as_auto() {
        let app = Router::new().route(
            "/translate",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "translatedText": body["source"].clone() }))
            }),
        );
        let url = serve(app).await;

        let echoed = client(url, None)
            .translate("hola", &LanguageCode::unknown(), &LanguageCode::parse("en").unwrap())
            .await
            .unwrap();
        assert_eq!(echoed, "auto");
    }

    #[tokio::test]
    async fn error_status_is_an_error() {
        let app = Router::new().route(
            "/translate",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let url = serve(app).await;

        let err = client(url, None)
            .translate("hola", &LanguageCode::auto(), &LanguageCode::parse("en").unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
