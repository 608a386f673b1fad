//! Doubles and fixtures shared by the unit and router tests.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;

use polyglot_db::Database;
use polyglot_translate::{LanguageDetector, TranslationBackend, Translator};
use polyglot_types::LanguageCode;

use crate::auth::{AppState, AppStateInner};
use crate::pipeline::Pipeline;
use crate::storage::ArtifactStore;

pub const TEST_SECRET: &str = "router-test-secret";

pub struct FixedDetector(LanguageCode);

impl FixedDetector {
    pub fn new(code: &str) -> Self {
        Self(LanguageCode::parse(code).unwrap())
    }
}

impl LanguageDetector for FixedDetector {
    fn detect(&self, _text: &str) -> LanguageCode {
        self.0.clone()
    }
}

/// Knows a couple of French phrases; tags anything else with the target.
#[derive(Default)]
pub struct Dictionary {
    calls: AtomicUsize,
}

impl Dictionary {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationBackend for Dictionary {
    async fn translate(
        &self,
        text: &str,
        _source: &LanguageCode,
        target: &LanguageCode,
    ) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match text {
            "Bonjour le monde" => "Hello world".to_string(),
            "bonjour" => "hello".to_string(),
            other => format!("[{target}] {other}"),
        })
    }
}

pub struct Offline;

#[async_trait]
impl TranslationBackend for Offline {
    async fn translate(
        &self,
        _text: &str,
        _source: &LanguageCode,
        _target: &LanguageCode,
    ) -> anyhow::Result<String> {
        anyhow::bail!("connection refused")
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

/// Application state over an in-memory database and temporary directories.
/// The directories live as long as the returned guard.
pub async fn test_state(
    detected: &str,
    backend: Arc<dyn TranslationBackend>,
) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open_in_memory().unwrap());
    let uploads = Arc::new(ArtifactStore::new(dir.path().join("uploads")).await.unwrap());
    let photos = Arc::new(ArtifactStore::new(dir.path().join("photos")).await.unwrap());
    let pipeline = Pipeline::new(
        db.clone(),
        uploads.clone(),
        Arc::new(FixedDetector::new(detected)),
        Translator::new(backend),
    );

    let state = Arc::new(AppStateInner {
        db,
        pipeline,
        uploads,
        photos,
        jwt_secret: TEST_SECRET.to_string(),
        session_ttl: Duration::days(7),
    });
    (state, dir)
}
