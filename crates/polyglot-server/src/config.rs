use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Secrets that ship in sample configs and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "dev-secret-change-me",
    "change-me",
    "changeme",
    "secret",
    "your-secret-key",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub photo_dir: PathBuf,
    pub jwt_secret: String,
    pub session_days: i64,
    pub translate_url: String,
    pub translate_api_key: Option<String>,
    pub translate_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or blank keys take their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("POLYGLOT_JWT_SECRET").context("POLYGLOT_JWT_SECRET must be set")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("POLYGLOT_JWT_SECRET is a placeholder value, set a real secret");
        }

        let port = or("POLYGLOT_PORT", "3000")
            .parse()
            .context("POLYGLOT_PORT must be a port number")?;
        let session_days: i64 = or("POLYGLOT_SESSION_DAYS", "7")
            .parse()
            .context("POLYGLOT_SESSION_DAYS must be a whole number of days")?;
        if session_days < 1 {
            bail!("POLYGLOT_SESSION_DAYS must be at least 1");
        }
        let timeout_secs: u64 = or("POLYGLOT_TRANSLATE_TIMEOUT_SECS", "15")
            .parse()
            .context("POLYGLOT_TRANSLATE_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Self {
            host: or("POLYGLOT_HOST", "0.0.0.0"),
            port,
            db_path: or("POLYGLOT_DB_PATH", "polyglot.db").into(),
            upload_dir: or("POLYGLOT_UPLOAD_DIR", "uploads").into(),
            photo_dir: or("POLYGLOT_PHOTO_DIR", "profile_photos").into(),
            jwt_secret,
            session_days,
            translate_url: or("POLYGLOT_TRANSLATE_URL", "http://localhost:5000"),
            translate_api_key: get("POLYGLOT_TRANSLATE_API_KEY"),
            translate_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
