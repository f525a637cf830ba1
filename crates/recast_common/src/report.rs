//! Summary of one engine run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a run rebuilt everything or patched the previous state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// No usable state existed; every input was processed.
    Full,
    /// Only the inputs affected by the change set were processed.
    Incremental,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Incremental => f.write_str("incremental"),
        }
    }
}

/// What a compile or merge run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Full or incremental.
    pub mode: RunMode,
    /// Units processed: files compiled, or output paths created or updated.
    pub units: usize,
    /// Main files or output paths whose outputs were deleted.
    pub removed: usize,
}

impl RunReport {
    /// Creates a report.
    pub fn new(mode: RunMode, units: usize, removed: usize) -> Self {
        Self {
            mode,
            units,
            removed,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} run: {} processed, {} removed",
            self.mode, self.units, self.removed
        )
    }
}
