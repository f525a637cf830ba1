//! Turning a change set into recompilations and output removals.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use recast_common::FileStatus;
use recast_state::{ChangeMap, DependencyData, DependencyStore};
use tracing::debug;

use crate::error::CompileError;

/// The work derived from one change set.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Main files to (re)compile.
    pub compile: BTreeSet<PathBuf>,
    /// Edges of removed main files, whose outputs must be deleted.
    pub remove: Vec<DependencyData>,
}

impl InvalidationPlan {
    /// Returns `true` if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.compile.is_empty() && self.remove.is_empty()
    }
}

/// Computes which main files to recompile and which edges to drop.
///
/// - a new file under a source root is compiled;
/// - a changed main file is recompiled, and so is every main file that
///   lists a changed path as a dependency;
/// - a removed main file has its edge scheduled for removal.
///
/// A removed path that was only a dependency schedules nothing. Neither does
/// a new file outside every source root (an import-only file).
pub fn plan_invalidation(
    changes: &ChangeMap,
    store: &DependencyStore,
    source_roots: &[PathBuf],
) -> InvalidationPlan {
    let mut plan = InvalidationPlan::default();
    let mut removed = BTreeSet::new();

    for (path, status) in changes {
        match status {
            FileStatus::New => {
                if source_root_for(path, source_roots).is_ok() {
                    plan.compile.insert(path.clone());
                } else {
                    debug!(path = %path.display(), "new file outside source roots");
                }
            }
            FileStatus::Changed => {
                if store.is_main_file(path) {
                    plan.compile.insert(path.clone());
                }
                plan.compile.extend(store.dependents_of(path).cloned());
            }
            FileStatus::Removed => match store.edge(path) {
                Some(edge) => {
                    removed.insert(path.clone());
                    plan.remove.push(edge.clone());
                }
                None => debug!(path = %path.display(), "removed dependency ignored"),
            },
        }
    }

    plan.compile.retain(|p| !removed.contains(p));
    plan
}

/// Finds the configured source root containing `file` by walking its parents.
pub fn source_root_for<'a>(file: &Path, roots: &'a [PathBuf]) -> Result<&'a Path, CompileError> {
    file.ancestors()
        .skip(1)
        .find_map(|parent| roots.iter().find(|root| root.as_path() == parent))
        .map(PathBuf::as_path)
        .ok_or_else(|| CompileError::OutsideSourceRoots {
            path: file.to_path_buf(),
        })
}
