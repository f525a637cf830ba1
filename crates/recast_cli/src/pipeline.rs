//! Shared helpers for CLI commands.
//!
//! Project root discovery, config loading with paths anchored at the root,
//! executor construction, and report printing.

use std::error::Error;
use std::path::{Path, PathBuf};

use recast_common::RunReport;
use recast_config::{load_config, load_config_file, resolve_paths, ProjectConfig, CONFIG_FILE};
use recast_exec::WorkExecutor;
use tracing::debug;

use crate::GlobalArgs;

/// A loaded project: its root and its path-resolved configuration.
pub struct Project {
    /// Directory containing the configuration file.
    pub root: PathBuf,
    /// Configuration with every relative path anchored at `root`.
    pub config: ProjectConfig,
}

/// Walks up from `start` looking for the nearest directory containing `recast.toml`.
///
/// Returns the directory containing `recast.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `recast.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Finds, loads, validates, and path-resolves the project configuration.
///
/// A `--config` naming a file is read as is, whatever its name.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn Error>> {
    let root = resolve_project_root(global)?;
    let config = match global.config.as_deref().map(Path::new).filter(|p| p.is_file()) {
        Some(file) => load_config_file(file)?,
        None => load_config(&root)?,
    };
    let config = resolve_paths(&config, &root);
    debug!(root = %root.display(), project = %config.project.name, "loaded project");
    Ok(Project { root, config })
}

/// Builds the worker pool, honouring `--threads` over the config value.
pub fn build_executor(config: &ProjectConfig, global: &GlobalArgs) -> Result<WorkExecutor, Box<dyn Error>> {
    let threads = global.threads.unwrap_or(config.executor.threads);
    Ok(WorkExecutor::new(threads)?)
}

/// Prints a run report: JSON on stdout with `--json`, a status line on stderr
/// otherwise (suppressed by `--quiet`).
pub fn print_report(step: &str, report: &RunReport, global: &GlobalArgs) -> Result<(), Box<dyn Error>> {
    if global.json {
        println!("{}", serde_json::to_string(report)?);
    } else if !global.quiet {
        eprintln!("{:>12} {step}: {report}", "Finished");
    }
    Ok(())
}

/// Joins an error and its sources into one `a: b: c` line.
pub fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
