//! Error types shared by the workflow modules.
//!
//! Every failure here is recoverable and meant to be shown to the user;
//! the CLI wraps these in `anyhow` at the edge.

use thiserror::Error;

use crate::models::UnknownVariant;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed input, caught before any backend call
    #[error("{0}")]
    Validation(String),

    /// A candidate with the same email or LinkedIn URL already exists
    #[error("duplicate candidate: {0}")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The signed-in identity lacks the capability for this operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not signed in. Run 'recruit login' first.")]
    NotSignedIn,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document preview failed; the stored file is still downloadable
    #[error("document conversion failed: {0}")]
    Conversion(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<UnknownVariant> for AppError {
    fn from(err: UnknownVariant) -> Self {
        AppError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
