//! Deterministic multi-input content merger.
//!
//! Many [`MergeInput`]s may offer bytes for the same relative path. The
//! planner orders, renames, and filters the inputs; a [`PackagingPolicy`]
//! decides per path whether contributors are concatenated, whether only the
//! first counts, or whether exactly one is allowed. [`IncrementalMerger`]
//! compares the result with the [`MergeState`](recast_state::MergeState) of
//! the previous run and issues one create, update, or remove per affected
//! output path.

#![warn(missing_docs)]

pub mod accept;
pub mod driver;
pub mod error;
pub mod input;
pub mod output;
pub mod plan;
pub mod policy;
pub mod resolve;

pub use accept::{ContentRules, PathFilter};
pub use driver::{IncrementalMerger, MergeSettings};
pub use error::MergeError;
pub use input::{DirectoryInput, FilteredInput, MemoryInput, MergeInput, RenamedInput};
pub use output::{DirectoryOutput, MergeOutput, ProjectOverride};
pub use plan::plan_inputs;
pub use policy::{PackagingAction, PackagingPolicy};
pub use resolve::MergeAlgorithm;
