//! Crate-level error type

use crate::store::StoreError;

/// Errors surfaced by startup and request handling.
#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used across the crate
pub type InboxResult<T> = Result<T, InboxError>;
