use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Translation, User};

// -- JWT Claims --

/// Claims carried by session tokens. `jti` names the server-side session row,
/// so a token stops validating once its session is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub jti: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// -- Profile --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: String,
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

pub type ProfileResponse = User;

// -- Translation requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextTranslationRequest {
    pub text: String,
    pub target_language: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceTranslationRequest {
    /// Transcript produced client-side by speech recognition.
    pub transcript: String,
    pub target_language: String,
}

#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    pub translation: Translation,
    /// Artifact name to pass to `GET /files/{name}`, file translations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
}

// -- History --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditTranslationRequest {
    pub translated_text: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryPage {
    pub items: Vec<Translation>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_next: bool,
}

// -- Statistics --

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LanguageCount {
    pub code: String,
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub total: u64,
    pub voice_count: u64,
    pub text_count: u64,
    pub file_count: u64,
    pub voice_percentage: f64,
    pub text_percentage: f64,
    pub file_percentage: f64,
    pub top_languages: Vec<LanguageCount>,
    pub recent: Vec<Translation>,
}

// -- Languages --

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}
