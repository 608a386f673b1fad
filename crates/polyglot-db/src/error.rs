use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist, or exists but belongs to someone else.
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{field} is already registered")]
    Duplicate { field: &'static str },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(e.into())
    }
}
