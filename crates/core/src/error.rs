//! Engine error model.

use thiserror::Error;

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error.
///
/// Every failure is scoped to the one business operation invoked; no error in
/// this taxonomy is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed or out-of-range input. Caller's fault, surfaced verbatim.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced item or record is absent.
    #[error("not found")]
    NotFound,

    /// A concurrent writer raced this operation (stale revision).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The persistence collaborator failed. Not retried automatically.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
