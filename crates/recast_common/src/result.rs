//! Common result and error types for the recast engine.

/// The standard result type for operations that can only fail through a defect.
///
/// `Err` indicates an unrecoverable internal error (a bug in recast), not a
/// user-facing problem. Failures caused by inputs or configuration are reported
/// through each crate's own error enum.
pub type RecastResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in recast, not a user input problem.
///
/// These errors should never occur during normal operation. If one does occur,
/// an invariant of the engine was broken and should be fixed.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
