//! The merge driver: full/incremental decision, per-path actions, and state upkeep.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use recast_common::{ContentHash, RunMode, RunReport};
use recast_config::{ContentKind, MergeConfig};
use recast_exec::WorkExecutor;
use recast_state::{LoadOutcome, MergeState, Snapshot, StateStore};
use tracing::{info, warn};

use crate::accept::{ContentRules, PathFilter};
use crate::error::MergeError;
use crate::input::{FilteredInput, MergeInput};
use crate::output::{DirectoryOutput, MergeOutput, ProjectOverride};
use crate::plan::plan_inputs;
use crate::policy::PackagingPolicy;

/// File name of the merge state inside the state directory.
pub const STATE_FILE: &str = "merge-state";

type Unit<'s> = Box<dyn FnOnce() -> Result<(), MergeError> + Send + 's>;

/// Resolved settings of the merger.
#[derive(Debug, Clone)]
pub struct MergeSettings {
    /// Kind of content merged.
    pub content: ContentKind,
    /// Directory receiving merged outputs.
    pub output_dir: PathBuf,
    /// Directory holding the merge state.
    pub state_dir: PathBuf,
}

impl MergeSettings {
    /// Builds settings from an already path-resolved configuration section.
    pub fn from_config(config: &MergeConfig) -> Self {
        Self {
            content: config.content,
            output_dir: config.output_dir.clone(),
            state_dir: config.state_dir.clone(),
        }
    }

    /// Location of the merge state.
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    /// Deletes the merge state and empties the output directory.
    pub fn clean(&self) -> Result<(), MergeError> {
        StateStore::<MergeState>::new(self.state_file()).delete()?;
        clean_dir(&self.output_dir)
    }
}

/// What happens to one output path.
enum PathAction<'i> {
    Create(&'i str, Vec<&'i dyn MergeInput>),
    Update(&'i str, Vec<String>, Vec<&'i dyn MergeInput>),
    Remove(String),
}

/// Merges a set of inputs into a directory, incrementally when possible.
pub struct IncrementalMerger<'a> {
    settings: &'a MergeSettings,
    filter: PathFilter,
    executor: &'a WorkExecutor,
    store: StateStore<MergeState>,
}

impl<'a> IncrementalMerger<'a> {
    /// Creates a driver for `settings` with the given packaging policy.
    pub fn new(
        settings: &'a MergeSettings,
        policy: PackagingPolicy,
        executor: &'a WorkExecutor,
    ) -> Result<Self, MergeError> {
        let filter = PathFilter::new(ContentRules::new(settings.content)?, policy);
        Ok(Self {
            settings,
            filter,
            executor,
            store: StateStore::new(settings.state_file()),
        })
    }

    /// The persisted merge state.
    pub fn state_store(&self) -> &StateStore<MergeState> {
        &self.store
    }

    /// Brings the output directory in line with `inputs`.
    ///
    /// Every run considers the complete input set. The previous state only
    /// decides which output paths can be left alone, and only if it was
    /// produced under the same content kind, packaging rules and input
    /// scopes. On failure the state file is deleted, so the next run starts
    /// from scratch.
    pub fn run(&self, inputs: &[&dyn MergeInput]) -> Result<RunReport, MergeError> {
        let config = self.config_fingerprint(inputs);
        let (mode, previous) = match self.store.load() {
            LoadOutcome::Loaded(state) if state.config() == Some(&config) => {
                (RunMode::Incremental, state)
            }
            LoadOutcome::Loaded(_) => {
                info!("merge configuration changed, full run");
                (RunMode::Full, MergeState::new())
            }
            LoadOutcome::NotFound => {
                info!("no merge state, full run");
                (RunMode::Full, MergeState::new())
            }
            LoadOutcome::Corrupt(e) => {
                info!(error = %e, "failed to read merge state, full run");
                self.store.delete()?;
                (RunMode::Full, MergeState::new())
            }
        };
        if mode == RunMode::Full {
            clean_dir(&self.settings.output_dir)?;
        }

        let planned = plan_inputs(inputs, self.settings.content, &self.filter);
        let contributors = collect_contributors(&planned);
        let fingerprints = collect_fingerprints(&planned);
        let actions = diff(&previous, &contributors, &fingerprints);

        let (mut written, mut removed) = (0, 0);
        for action in &actions {
            match action {
                PathAction::Remove(_) => removed += 1,
                _ => written += 1,
            }
        }
        info!(
            %mode,
            paths = contributors.len(),
            write = written,
            remove = removed,
            "merging"
        );

        let policy = self.filter.policy();
        let output = ProjectOverride::new(
            DirectoryOutput::new(&self.settings.output_dir, policy),
            policy,
        );
        self.dispatch(actions, &output)?;

        let mut state = MergeState::new();
        for (path, inputs) in &contributors {
            state.set_contributors(
                path.as_str(),
                inputs.iter().map(|i| i.name().to_string()).collect(),
            );
        }
        state.set_inputs(fingerprints);
        state.set_config(config);
        self.store.save(&state)?;
        Ok(RunReport::new(mode, written, removed))
    }

    /// Fingerprint of everything besides input content that shapes the output.
    ///
    /// Inputs are taken by name so that reordering them stays incremental.
    fn config_fingerprint(&self, inputs: &[&dyn MergeInput]) -> ContentHash {
        let mut described: Vec<String> = inputs
            .iter()
            .map(|input| {
                format!(
                    "{}\0{}\0{}",
                    input.name(),
                    input.scope(),
                    input.is_directory()
                )
            })
            .collect();
        described.sort();
        let head = [
            format!("{:?}", self.settings.content),
            self.filter.policy().fingerprint().to_string(),
        ];
        ContentHash::from_fields(head.into_iter().chain(described))
    }

    /// Runs removals to completion before any write, so a path can turn
    /// from a file into a directory (or back) within one run.
    fn dispatch(
        &self,
        actions: Vec<PathAction<'_>>,
        output: &dyn MergeOutput,
    ) -> Result<(), MergeError> {
        let mut removals: Vec<Unit<'_>> = Vec::new();
        let mut writes: Vec<Unit<'_>> = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                PathAction::Create(path, inputs) => {
                    writes.push(Box::new(move || output.create(path, &inputs)));
                }
                PathAction::Update(path, previous, inputs) => {
                    writes.push(Box::new(move || output.update(path, &previous, &inputs)));
                }
                PathAction::Remove(path) => {
                    removals.push(Box::new(move || output.remove(&path)));
                }
            }
        }

        for batch in [removals, writes] {
            if let Err(fail) = self.executor.run_quick_fail(batch) {
                if let Err(e) = self.store.delete() {
                    warn!(error = %e, "failed to delete merge state");
                }
                return Err(fail.into());
            }
        }
        Ok(())
    }
}

/// Output path -> contributing inputs, in planned input order.
fn collect_contributors<'i>(
    planned: &'i [FilteredInput<'_>],
) -> BTreeMap<String, Vec<&'i dyn MergeInput>> {
    let mut contributors: BTreeMap<String, Vec<&'i dyn MergeInput>> = BTreeMap::new();
    for input in planned {
        for path in input.paths() {
            contributors.entry(path).or_default().push(input);
        }
    }
    contributors
}

/// Input name -> fingerprints of the paths it offers after filtering.
fn collect_fingerprints(planned: &[FilteredInput<'_>]) -> BTreeMap<String, Snapshot<String>> {
    planned
        .iter()
        .map(|input| {
            let snapshot = input
                .paths()
                .into_iter()
                .filter_map(|p| input.fingerprint(&p).map(|hash| (p, hash)))
                .collect();
            (input.name().to_string(), snapshot)
        })
        .collect()
}

/// Compares the current contributors with the previous run.
///
/// A path is unchanged only if the same inputs contribute in the same order
/// and each of them offers the same content as last time.
fn diff<'i>(
    previous: &MergeState,
    contributors: &'i BTreeMap<String, Vec<&'i dyn MergeInput>>,
    fingerprints: &BTreeMap<String, Snapshot<String>>,
) -> Vec<PathAction<'i>> {
    let mut actions = Vec::new();
    for (path, inputs) in contributors {
        let Some(before) = previous.contributors(path) else {
            actions.push(PathAction::Create(path, inputs.clone()));
            continue;
        };
        let same_inputs = before.len() == inputs.len()
            && before.iter().zip(inputs).all(|(name, input)| name == input.name());
        let same_content = inputs.iter().all(|input| {
            let old = previous
                .input_fingerprints(input.name())
                .and_then(|snapshot| snapshot.get(path));
            let new = fingerprints
                .get(input.name())
                .and_then(|snapshot| snapshot.get(path));
            old.is_some() && old == new
        });
        if !(same_inputs && same_content) {
            actions.push(PathAction::Update(path, before.to_vec(), inputs.clone()));
        }
    }
    for path in previous.paths() {
        if !contributors.contains_key(path) {
            actions.push(PathAction::Remove(path.to_string()));
        }
    }
    actions
}

fn clean_dir(dir: &Path) -> Result<(), MergeError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(MergeError::io(dir, e)),
    }
    std::fs::create_dir_all(dir).map_err(|e| MergeError::io(dir, e))
}
