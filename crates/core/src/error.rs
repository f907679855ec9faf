//! Engine error model.

use thiserror::Error;

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error.
///
/// Keep this focused on deterministic lifecycle failures (validation,
/// conflicts, missing jobs). The only non-deterministic variant is
/// `Unavailable`, which wraps transient store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A value failed validation (e.g. malformed payload, bad priority).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The job does not exist, or is not in the state the operation requires.
    #[error("not found")]
    NotFound,

    /// The operation is not allowed in the job's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed transiently; the caller may retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
