//! Where merged paths are written.

use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MergeError;
use crate::input::MergeInput;
use crate::policy::PackagingPolicy;
use crate::resolve::{project_override, MergeAlgorithm};

/// Receives exactly one call per affected output path per run.
pub trait MergeOutput: Sync {
    /// A path no previous run produced.
    fn create(&self, path: &str, contributors: &[&dyn MergeInput]) -> Result<(), MergeError>;

    /// A path produced before whose contributors or their content changed.
    fn update(
        &self,
        path: &str,
        previous: &[String],
        contributors: &[&dyn MergeInput],
    ) -> Result<(), MergeError>;

    /// A path no input contributes to anymore.
    fn remove(&self, path: &str) -> Result<(), MergeError>;
}

/// Writes each path into a directory, combining contributors with the
/// algorithm the policy selects for that path.
pub struct DirectoryOutput<'p> {
    root: PathBuf,
    policy: &'p PackagingPolicy,
}

impl<'p> DirectoryOutput<'p> {
    /// Creates an output rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, policy: &'p PackagingPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    /// The output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, path: &str, contributors: &[&dyn MergeInput]) -> Result<(), MergeError> {
        let algorithm = MergeAlgorithm::select(self.policy.action(path))?;
        let dest = self.root.join(path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
        }
        if dest.is_dir() {
            debug!(path, "replacing directory with file");
            std::fs::remove_dir_all(&dest).map_err(|e| MergeError::io(&dest, e))?;
        }
        let file = std::fs::File::create(&dest).map_err(|e| MergeError::io(&dest, e))?;
        let mut out = BufWriter::new(file);
        algorithm.merge(path, contributors, &mut out)?;
        out.flush().map_err(|e| MergeError::io(&dest, e))
    }

    /// Removes directories left empty by a removal, stopping at the root.
    fn prune_empty_parents(&self, dest: &Path) {
        let mut dir = dest.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // Fails on the first directory that still has entries.
            if std::fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

impl MergeOutput for DirectoryOutput<'_> {
    fn create(&self, path: &str, contributors: &[&dyn MergeInput]) -> Result<(), MergeError> {
        debug!(path, contributors = contributors.len(), "create");
        self.write(path, contributors)
    }

    fn update(
        &self,
        path: &str,
        previous: &[String],
        contributors: &[&dyn MergeInput],
    ) -> Result<(), MergeError> {
        debug!(path, previous = previous.len(), contributors = contributors.len(), "update");
        self.write(path, contributors)
    }

    fn remove(&self, path: &str) -> Result<(), MergeError> {
        debug!(path, "remove");
        let dest = self.root.join(path);
        match std::fs::remove_file(&dest) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(MergeError::io(dest, e)),
        }
        self.prune_empty_parents(&dest);
        Ok(())
    }
}

/// Lets project content win paths that would otherwise be conflicts.
///
/// Wraps another output and applies [`project_override`] to the contributors
/// of every create and update.
pub struct ProjectOverride<'p, O> {
    inner: O,
    policy: &'p PackagingPolicy,
}

impl<'p, O: MergeOutput> ProjectOverride<'p, O> {
    /// Wraps `inner`.
    pub fn new(inner: O, policy: &'p PackagingPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<O: MergeOutput> MergeOutput for ProjectOverride<'_, O> {
    fn create(&self, path: &str, contributors: &[&dyn MergeInput]) -> Result<(), MergeError> {
        let kept = project_override(self.policy.action(path), contributors);
        self.inner.create(path, &kept)
    }

    fn update(
        &self,
        path: &str,
        previous: &[String],
        contributors: &[&dyn MergeInput],
    ) -> Result<(), MergeError> {
        let kept = project_override(self.policy.action(path), contributors);
        self.inner.update(path, previous, &kept)
    }

    fn remove(&self, path: &str) -> Result<(), MergeError> {
        self.inner.remove(path)
    }
}
