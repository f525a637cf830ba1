//! Error types for the merger.

use std::path::PathBuf;

use recast_common::InternalError;
use recast_exec::{ExecError, QuickFail};
use recast_state::StateError;

/// Errors that can occur during a merge run.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// More than one input offers a path that allows a single contributor.
    #[error("more than one input contributes '{path}': {}", inputs.join(", "))]
    DuplicatePath {
        /// The conflicting output path.
        path: String,
        /// Names of the contributing inputs, in order.
        inputs: Vec<String>,
    },

    /// An input was asked for a path it does not offer.
    #[error("input '{input}' has no path '{path}'")]
    MissingPath {
        /// Input name.
        input: String,
        /// Requested path.
        path: String,
    },

    /// A packaging or acceptance pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Reading an input or writing an output failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Saving or deleting the merge state failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// The worker pool could not be built.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// An engine invariant was broken.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// A merge unit failed; the batch was stopped and the state discarded.
    #[error("merge failed: {0}")]
    UnitFailed(#[source] Box<QuickFail<MergeError>>),
}

impl MergeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<QuickFail<MergeError>> for MergeError {
    fn from(fail: QuickFail<MergeError>) -> Self {
        Self::UnitFailed(Box::new(fail))
    }
}
