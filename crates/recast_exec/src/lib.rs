//! Parallel execution of independent units of work.
//!
//! The [`WorkExecutor`] owns an explicitly sized worker pool. The coordinating
//! thread hands it a batch of units and blocks until every started unit has
//! finished. On the first failure no further unit is started ("quick fail");
//! units already running finish on their own.

#![warn(missing_docs)]

pub mod error;
pub mod executor;

pub use error::{ExecError, QuickFail};
pub use executor::{ExecReport, WorkExecutor};
