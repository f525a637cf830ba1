//! Persisted state for incremental recomputation.
//!
//! This crate owns everything that survives between two runs: the change
//! classifier that diffs fingerprint snapshots, the framed on-disk container
//! with crash-safe writes, and the two state models (compiler dependency
//! edges and merger contributor lists).

#![warn(missing_docs)]

pub mod classify;
pub mod container;
pub mod dependency;
mod depfile;
pub mod error;
pub mod merge_state;
pub mod store;

pub use classify::{classify, ChangeMap, Snapshot, SourceHasher};
pub use dependency::{DependencyData, DependencyStore};
pub use error::StateError;
pub use merge_state::MergeState;
pub use store::{LoadOutcome, PersistedState, StateStore};
