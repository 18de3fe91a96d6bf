//! Store error types

use thiserror::Error;

/// Errors from the session/profile store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid profile field: {0}")]
    InvalidField(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
