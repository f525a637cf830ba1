//! Error types for the incremental compiler.

use std::path::PathBuf;

use recast_exec::{ExecError, QuickFail};
use recast_state::StateError;

/// Errors that can occur during a compile run.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A file scheduled for compilation is not inside any configured source root.
    #[error("file '{}' is not in a source directory", path.display())]
    OutsideSourceRoots {
        /// The file that could not be placed.
        path: PathBuf,
    },

    /// The compile tool could not be started.
    #[error("failed to run '{tool}': {source}")]
    Spawn {
        /// Program name.
        tool: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The compile tool exited unsuccessfully.
    #[error("compiling '{}' failed ({status}): {stderr}", file.display())]
    ToolFailed {
        /// The main file being compiled.
        file: PathBuf,
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error of the tool.
        stderr: String,
    },

    /// The source glob could not be compiled.
    #[error("invalid source pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending glob.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A filesystem operation on sources or outputs failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Saving or deleting the dependency store failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// The worker pool could not be built.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// A compile unit failed; the batch was stopped and the state discarded.
    #[error("compilation failed: {0}")]
    UnitFailed(#[source] Box<QuickFail<CompileError>>),
}

impl CompileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<QuickFail<CompileError>> for CompileError {
    fn from(fail: QuickFail<CompileError>) -> Self {
        Self::UnitFailed(Box::new(fail))
    }
}
