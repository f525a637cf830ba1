//! Combining the contributors of one output path.

use std::io::{self, Write};

use recast_common::{InternalError, RecastResult};

use crate::error::MergeError;
use crate::input::MergeInput;
use crate::policy::PackagingAction;

/// How the bytes of a path's contributors become the output bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAlgorithm {
    /// Copy the first contributor, ignore the rest.
    PickFirst,
    /// Concatenate every contributor in order.
    Concat,
    /// Copy the only contributor; more than one is a conflict.
    AcceptOnlyOne,
}

impl MergeAlgorithm {
    /// Selects the algorithm for a packaging action.
    ///
    /// Excluded paths are removed from the inputs before merging, so asking
    /// for one here is a defect.
    pub fn select(action: PackagingAction) -> RecastResult<Self> {
        match action {
            PackagingAction::Exclude => Err(InternalError::new(
                "excluded path reached the merge resolver",
            )),
            PackagingAction::PickFirst => Ok(Self::PickFirst),
            PackagingAction::Merge => Ok(Self::Concat),
            PackagingAction::Single => Ok(Self::AcceptOnlyOne),
        }
    }

    /// Writes the combined bytes of `path` from `contributors` into `out`.
    pub fn merge(
        self,
        path: &str,
        contributors: &[&dyn MergeInput],
        out: &mut dyn Write,
    ) -> Result<(), MergeError> {
        let selected = match self {
            Self::PickFirst => &contributors[..contributors.len().min(1)],
            Self::Concat => contributors,
            Self::AcceptOnlyOne => {
                if contributors.len() > 1 {
                    return Err(MergeError::DuplicatePath {
                        path: path.to_string(),
                        inputs: contributors.iter().map(|i| i.name().to_string()).collect(),
                    });
                }
                contributors
            }
        };
        for input in selected {
            let mut reader = input.open(path)?;
            io::copy(&mut reader, out).map_err(|e| MergeError::io(path, e))?;
        }
        Ok(())
    }
}

/// Keeps only project-scoped contributors of a single-contributor path.
///
/// If `action` is [`PackagingAction::Single`] and at least one contributor is
/// project-scoped, every other contributor is dropped. Otherwise the list is
/// returned unchanged.
pub fn project_override<'i>(
    action: PackagingAction,
    contributors: &[&'i dyn MergeInput],
) -> Vec<&'i dyn MergeInput> {
    let has_project = contributors.iter().any(|i| i.scope().is_project());
    if action == PackagingAction::Single && has_project {
        contributors
            .iter()
            .copied()
            .filter(|i| i.scope().is_project())
            .collect()
    } else {
        contributors.to_vec()
    }
}
