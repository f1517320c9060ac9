//! Storage layer errors.

use thiserror::Error;

/// Errors raised by a [`crate::NoteStore`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The short code unique constraint rejected the write.
    #[error("Short code already in use: {short_code}")]
    Conflict { short_code: String },

    /// Any other backend failure. The reason is for server-side logs only.
    #[error("Store backend failure: {reason}")]
    Backend { reason: String },
}

impl StoreError {
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
