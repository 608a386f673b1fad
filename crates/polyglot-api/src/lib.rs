pub mod auth;
pub mod error;
pub mod files;
pub mod form;
pub mod history;
pub mod middleware;
pub mod pipeline;
pub mod profile;
pub mod routes;
pub mod storage;
pub mod translations;

#[cfg(test)]
mod testing;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use pipeline::{Pipeline, TranslationInput};
pub use routes::router;
