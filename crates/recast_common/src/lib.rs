//! Shared foundational types used across the recast incremental engine.
//!
//! This crate provides content fingerprints, the per-path change status produced
//! by change classification, the run summary returned by both drivers, and the
//! internal error type used to report defects.

#![warn(missing_docs)]

pub mod hash;
pub mod report;
pub mod result;
pub mod status;

pub use hash::ContentHash;
pub use report::{RunMode, RunReport};
pub use result::{InternalError, RecastResult};
pub use status::FileStatus;
