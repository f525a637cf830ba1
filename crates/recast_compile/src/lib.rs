//! Dependency-tracking incremental compiler.
//!
//! Each main file found under a source root is compiled independently by a
//! [`FileCompiler`]. Every compilation reports the files it imported and the
//! outputs it wrote through a [`DependencySink`]; the resulting edges are kept
//! in a [`DependencyStore`](recast_state::DependencyStore). On the next run,
//! [`plan_invalidation`] turns the change set into the closure of main files
//! to recompile and the edges whose outputs must be deleted, and
//! [`IncrementalCompiler`] executes that plan on a
//! [`WorkExecutor`](recast_exec::WorkExecutor).

#![warn(missing_docs)]

pub mod compiler;
pub mod driver;
pub mod error;
pub mod invalidate;
pub mod scan;
pub mod sink;

pub use compiler::{CompileRequest, FileCompiler, ToolCompiler};
pub use driver::{CompileSettings, IncrementalCompiler};
pub use error::CompileError;
pub use invalidate::{plan_invalidation, source_root_for, InvalidationPlan};
pub use sink::DependencySink;
