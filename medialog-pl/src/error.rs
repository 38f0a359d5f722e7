//! Error types for medialog-pl
//!
//! Validation errors are raised before any mutation. Storage errors are the
//! only retryable kind: the caller reports them and a later full sync repairs
//! whatever state a failed sync left behind.

use thiserror::Error;

/// Message shown when an error carries no text of its own
pub const GENERIC_SAVE_FAILURE: &str = "Saving failed. Please wait a moment and try again.";

/// Main error type for medialog-pl
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected input (series/category mismatch, empty names, bad rating)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Item, category or series does not exist for this user
    #[error("Not found: {0}")]
    NotFound(String),

    /// Delete or insert against the database failed
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Malformed identifier in input or stored data
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the common crate (database init, config loading)
    #[error(transparent)]
    Common(#[from] medialog_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::Common(medialog_common::Error::Database(_))
        )
    }

    /// Human-readable message for the interacting user
    pub fn user_message(&self) -> String {
        let message = match self {
            Error::Validation(m) | Error::NotFound(m) | Error::InvalidId(m) => m.clone(),
            other => other.to_string(),
        };

        if message.trim().is_empty() {
            GENERIC_SAVE_FAILURE.to_string()
        } else {
            message
        }
    }
}

impl From<uuid::Error> for Error {
    fn from(e: uuid::Error) -> Self {
        Error::InvalidId(e.to_string())
    }
}

/// Convenience Result type using medialog-pl Error
pub type Result<T> = std::result::Result<T, Error>;
