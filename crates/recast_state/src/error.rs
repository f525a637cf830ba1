//! Error types for state operations.

use std::path::PathBuf;

/// Errors that can occur while reading, decoding, or writing persisted state.
///
/// Loading is fail-safe: decode errors are folded into
/// [`LoadOutcome::Corrupt`](crate::LoadOutcome::Corrupt) by the store and never
/// reach the caller as failures. Writing and deleting propagate these errors.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// An I/O error occurred while reading or writing a state file.
    #[error("state I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The container header is missing, truncated, or of the wrong kind.
    #[error("invalid state header: {reason}")]
    InvalidHeader {
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the checksum of the payload.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The checksum recorded in the header.
        expected: String,
        /// The checksum computed from the payload.
        actual: String,
    },

    /// The container format version does not match the current version.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The expected format version.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = StateError::io(
            "/tmp/state/dependency.store",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("state I/O error"));
        assert!(msg.contains("dependency.store"));
    }

    #[test]
    fn invalid_header_display() {
        let err = StateError::InvalidHeader {
            reason: "missing magic bytes".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid state header"));
        assert!(msg.contains("missing magic bytes"));
    }

    #[test]
    fn checksum_mismatch_display() {
        let err = StateError::ChecksumMismatch {
            expected: "aabb".to_string(),
            actual: "ccdd".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("checksum mismatch"));
        assert!(msg.contains("aabb"));
        assert!(msg.contains("ccdd"));
    }

    #[test]
    fn version_mismatch_display() {
        let err = StateError::VersionMismatch {
            expected: 2,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("got 1"));
    }
}
