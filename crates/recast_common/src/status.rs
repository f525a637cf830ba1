//! Per-path change status between two runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a path differs from the previous run.
///
/// Unchanged paths have no status; they simply do not appear in a change map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileStatus {
    /// The path did not exist in the previous run.
    New,
    /// The path existed before and its fingerprint differs.
    Changed,
    /// The path existed before and is gone now.
    Removed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Removed => "removed",
        };
        f.write_str(s)
    }
}
