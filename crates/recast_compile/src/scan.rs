//! Discovery of source files under configured roots.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::error::CompileError;

/// Matches source files by a glob applied to their path relative to a root.
pub struct SourceScanner {
    matcher: GlobMatcher,
}

impl SourceScanner {
    /// Compiles `pattern` (for example `**/*.aidl`).
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        let glob = Glob::new(pattern).map_err(|e| CompileError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    /// Returns every matching file below `root`, sorted. A missing root yields
    /// no files.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, CompileError> {
        let mut files = Vec::new();
        if root.is_dir() {
            self.walk_dir(root, root, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    /// Scans several roots, concatenating the results in root order.
    pub fn scan_all(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>, CompileError> {
        let mut files = Vec::new();
        for root in roots {
            files.extend(self.scan(root)?);
        }
        Ok(files)
    }

    fn walk_dir(&self, root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), CompileError> {
        let entries = std::fs::read_dir(dir).map_err(|e| CompileError::io(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| CompileError::io(dir, e))?.path();
            if path.is_dir() {
                self.walk_dir(root, &path, files)?;
            } else if path
                .strip_prefix(root)
                .is_ok_and(|rel| self.matcher.is_match(rel))
            {
                files.push(path);
            }
        }
        Ok(())
    }
}
