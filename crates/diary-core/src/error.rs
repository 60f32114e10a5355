//! Error taxonomy for the diary core.
//!
//! One variant per failure class a host has to react to differently:
//! reject input, block writes, retry later, re-authenticate, or give
//! up on the storage backend. Messages carry enough context to log;
//! hosts decide how much of that reaches the patient.

use thiserror::Error;

/// Result type alias for diary operations.
pub type Result<T> = std::result::Result<T, DiaryError>;

/// Core error type for diary operations.
#[derive(Debug, Error)]
pub enum DiaryError {
    /// Malformed input to an append; rejected locally, never persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Integrity chain verification mismatch. Fatal: blocks further
    /// appends and sync pushes until resolved. Never auto-repaired.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Network failure or remote rejection. Recoverable, safe to retry,
    /// does not corrupt local state.
    #[error("Sync error: {0}")]
    Sync(String),

    /// Missing or invalid credential. Surfaced before any network call
    /// so callers can distinguish "cannot authenticate" from transport
    /// failure.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for DiaryError {
    fn from(err: std::io::Error) -> Self {
        DiaryError::Storage(err.to_string())
    }
}

impl From<rusqlite::Error> for DiaryError {
    fn from(err: rusqlite::Error) -> Self {
        DiaryError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DiaryError {
    fn from(err: serde_json::Error) -> Self {
        DiaryError::Validation(err.to_string())
    }
}
