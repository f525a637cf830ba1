//! `recast status`: reports what kind of run each step will do next.

use std::error::Error;
use std::path::{Path, PathBuf};

use recast_common::RunMode;
use recast_compile::CompileSettings;
use recast_merge::MergeSettings;
use recast_state::{DependencyStore, LoadOutcome, MergeState, PersistedState, StateStore};

use crate::pipeline::load_project;
use crate::GlobalArgs;

/// What a step's state file says about its next run.
#[derive(Debug, PartialEq, Eq)]
pub struct StepStatus {
    /// `compile` or `merge`.
    pub step: &'static str,
    /// State file location.
    pub path: PathBuf,
    /// `found`, `missing` or `corrupt`.
    pub state: &'static str,
    /// Kind of the next run.
    pub next: RunMode,
    /// Edges (compile) or output paths (merge) tracked by the state.
    pub tracked: usize,
}

impl StepStatus {
    fn inspect<T: PersistedState>(step: &'static str, path: &Path, count: impl Fn(&T) -> usize) -> Self {
        let (state, next, tracked) = match StateStore::<T>::new(path).load() {
            LoadOutcome::Loaded(loaded) => ("found", RunMode::Incremental, count(&loaded)),
            LoadOutcome::NotFound => ("missing", RunMode::Full, 0),
            LoadOutcome::Corrupt(_) => ("corrupt", RunMode::Full, 0),
        };
        Self {
            step,
            path: path.to_path_buf(),
            state,
            next,
            tracked,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "step": self.step,
            "path": self.path.display().to_string(),
            "state": self.state,
            "next": self.next,
            "tracked": self.tracked,
        })
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: state {} ({}), next run {}, {} tracked",
            self.step,
            self.state,
            self.path.display(),
            self.next,
            self.tracked
        )
    }
}

/// Inspects the state of every configured step.
pub fn collect(config: &recast_config::ProjectConfig) -> Vec<StepStatus> {
    let mut steps = Vec::new();
    if let Some(compile) = &config.compile {
        let settings = CompileSettings::from_config(compile);
        steps.push(StepStatus::inspect::<DependencyStore>(
            "compile",
            &settings.state_file(),
            DependencyStore::len,
        ));
    }
    if let Some(merge) = &config.merge {
        let settings = MergeSettings::from_config(merge);
        steps.push(StepStatus::inspect::<MergeState>(
            "merge",
            &settings.state_file(),
            MergeState::len,
        ));
    }
    steps
}

/// Executes the status command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = load_project(global)?;
    let steps = collect(&project.config);

    if global.json {
        let values: Vec<_> = steps.iter().map(StepStatus::to_json).collect();
        println!("{}", serde_json::to_string(&values)?);
    } else {
        if steps.is_empty() {
            println!("{}: no compile or merge step configured", project.config.project.name);
        }
        for step in &steps {
            println!("{step}");
        }
    }
    Ok(0)
}
