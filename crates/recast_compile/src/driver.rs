//! The compile driver: full/incremental decision, dispatch, and state upkeep.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use recast_common::{ContentHash, RunMode, RunReport};
use recast_config::CompileConfig;
use recast_exec::WorkExecutor;
use recast_state::{
    classify, DependencyData, DependencyStore, LoadOutcome, Snapshot, SourceHasher, StateStore,
};
use tracing::{debug, info, warn};

use crate::compiler::{CompileRequest, FileCompiler};
use crate::error::CompileError;
use crate::invalidate::{plan_invalidation, source_root_for};
use crate::scan::SourceScanner;
use crate::sink::DependencySink;

/// File name of the dependency store inside the state directory.
pub const STATE_FILE: &str = "dependency.store";

type Unit<'s> = Box<dyn FnOnce() -> Result<(), CompileError> + Send + 's>;

/// Resolved inputs and outputs of the compiler.
#[derive(Debug, Clone)]
pub struct CompileSettings {
    /// Roots whose matching files are main files.
    pub source_dirs: Vec<PathBuf>,
    /// Import-only roots.
    pub import_dirs: Vec<PathBuf>,
    /// Glob selecting main files below each root.
    pub source_glob: String,
    /// Primary output directory.
    pub output_dir: PathBuf,
    /// Secondary output directory for packaged sources.
    pub packaged_dir: Option<PathBuf>,
    /// Package prefixes eligible for packaging.
    pub package_allowlist: Option<Vec<String>>,
    /// Directory holding the dependency store.
    pub state_dir: PathBuf,
}

impl CompileSettings {
    /// Builds settings from an already path-resolved configuration section.
    pub fn from_config(config: &CompileConfig) -> Self {
        Self {
            source_dirs: config.source_dirs.clone(),
            import_dirs: config.import_dirs.clone(),
            source_glob: config.source_glob.clone(),
            output_dir: config.output_dir.clone(),
            packaged_dir: config.packaged_dir.clone(),
            package_allowlist: config.package_allowlist.clone(),
            state_dir: config.state_dir.clone(),
        }
    }

    /// Location of the dependency store.
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    /// Import search path: import-only roots first, then source roots.
    pub fn import_path(&self) -> Vec<PathBuf> {
        self.import_dirs
            .iter()
            .chain(&self.source_dirs)
            .cloned()
            .collect()
    }

    /// Fingerprint of every setting that shapes the outputs, together with
    /// the identity of `compiler`. The state directory is not part of it.
    pub fn fingerprint(&self, compiler: &dyn FileCompiler) -> ContentHash {
        let paths = |name: &str, dirs: &[PathBuf]| {
            let mut fields = vec![format!("\0{name}\0{}", dirs.len())];
            fields.extend(dirs.iter().map(|d| d.to_string_lossy().into_owned()));
            fields
        };
        let mut fields = paths("sources", &self.source_dirs);
        fields.extend(paths("imports", &self.import_dirs));
        fields.push(self.source_glob.clone());
        fields.push(self.output_dir.to_string_lossy().into_owned());
        fields.extend(paths("packaged", self.packaged_dir.as_slice()));
        match &self.package_allowlist {
            Some(list) => {
                fields.push(format!("\0allowlist\0{}", list.len()));
                fields.extend(list.iter().cloned());
            }
            None => fields.push("\0no-allowlist".to_string()),
        }
        fields.push(compiler.identity());
        ContentHash::from_fields(fields)
    }

    /// Deletes the dependency store and empties the output directories.
    pub fn clean(&self) -> Result<(), CompileError> {
        StateStore::<DependencyStore>::new(self.state_file()).delete()?;
        self.clean_outputs()
    }

    fn clean_outputs(&self) -> Result<(), CompileError> {
        clean_dir(&self.output_dir)?;
        if let Some(dir) = &self.packaged_dir {
            clean_dir(dir)?;
        }
        Ok(())
    }
}

/// Runs the compiler over a project, incrementally when possible.
pub struct IncrementalCompiler<'a> {
    settings: &'a CompileSettings,
    compiler: &'a dyn FileCompiler,
    executor: &'a WorkExecutor,
    store: StateStore<DependencyStore>,
    config: ContentHash,
}

impl<'a> IncrementalCompiler<'a> {
    /// Creates a driver. Nothing is read until [`run`](Self::run).
    pub fn new(
        settings: &'a CompileSettings,
        compiler: &'a dyn FileCompiler,
        executor: &'a WorkExecutor,
    ) -> Self {
        Self {
            settings,
            compiler,
            executor,
            store: StateStore::new(settings.state_file()),
            config: settings.fingerprint(compiler),
        }
    }

    /// The persisted dependency store.
    pub fn state_store(&self) -> &StateStore<DependencyStore> {
        &self.store
    }

    /// Compiles everything affected since the last successful run.
    ///
    /// Without a readable dependency store, or with one written under other
    /// settings or another compiler, every main file is compiled from clean
    /// output directories. If any unit fails the store is deleted, so the
    /// next run is a full one.
    pub fn run(&self) -> Result<RunReport, CompileError> {
        let scanner = SourceScanner::new(&self.settings.source_glob)?;
        match self.store.load() {
            LoadOutcome::Loaded(previous) if previous.config() == Some(&self.config) => {
                self.run_incremental(&scanner, previous)
            }
            LoadOutcome::Loaded(previous) => {
                info!("compile settings changed, full run");
                for edge in previous.edges() {
                    if let Err(e) = delete_outputs(edge) {
                        warn!(error = %e, "failed to delete previous output");
                    }
                }
                self.store.delete()?;
                self.run_full(&scanner)
            }
            LoadOutcome::NotFound => {
                info!("no dependency store, full run");
                self.run_full(&scanner)
            }
            LoadOutcome::Corrupt(e) => {
                info!(error = %e, "failed to read dependency store, full run");
                self.store.delete()?;
                self.run_full(&scanner)
            }
        }
    }

    fn run_full(&self, scanner: &SourceScanner) -> Result<RunReport, CompileError> {
        self.settings.clean_outputs()?;
        let current = self.snapshot(scanner, BTreeSet::new())?;
        let mains: BTreeSet<PathBuf> = scanner
            .scan_all(&self.settings.source_dirs)?
            .into_iter()
            .collect();

        let sink = DependencySink::new();
        self.dispatch(&mains, &[], &sink)?;

        let mut store = DependencyStore::new();
        store.update_all(sink.take_all());
        self.commit(store, current)?;
        info!(compiled = mains.len(), "full compile finished");
        Ok(RunReport::new(RunMode::Full, mains.len(), 0))
    }

    fn run_incremental(
        &self,
        scanner: &SourceScanner,
        mut store: DependencyStore,
    ) -> Result<RunReport, CompileError> {
        let current = self.snapshot(scanner, store.tracked_paths())?;
        let changes = classify(store.inputs(), &current);
        let plan = plan_invalidation(&changes, &store, &self.settings.source_dirs);
        info!(
            changes = changes.len(),
            compile = plan.compile.len(),
            remove = plan.remove.len(),
            "incremental compile"
        );

        let sink = DependencySink::new();
        self.dispatch(&plan.compile, &plan.remove, &sink)?;

        for edge in &plan.remove {
            store.remove(&edge.main_file);
        }
        let fresh = sink.take_all();
        for edge in &fresh {
            if let Some(old) = store.edge(&edge.main_file) {
                delete_stale_outputs(old, edge)?;
            }
        }
        store.update_all(fresh);
        self.commit(store, current)?;
        Ok(RunReport::new(
            RunMode::Incremental,
            plan.compile.len(),
            plan.remove.len(),
        ))
    }

    /// Runs one unit per main file to compile and per edge to clean up.
    ///
    /// On failure the dependency store is deleted before returning.
    fn dispatch(
        &self,
        compile: &BTreeSet<PathBuf>,
        remove: &[DependencyData],
        sink: &DependencySink,
    ) -> Result<(), CompileError> {
        let import_path = self.settings.import_path();
        let mut jobs = Vec::with_capacity(compile.len());
        for file in compile {
            let root = match source_root_for(file, &self.settings.source_dirs) {
                Ok(root) => root,
                Err(e) => {
                    self.discard_store();
                    return Err(e);
                }
            };
            jobs.push((root, file.as_path()));
        }

        let mut units: Vec<Unit<'_>> = Vec::with_capacity(jobs.len() + remove.len());
        for (source_root, file) in jobs {
            let import_path = import_path.as_slice();
            units.push(Box::new(move || {
                debug!(file = %file.display(), "compiling");
                let request = CompileRequest {
                    source_root,
                    file,
                    output_dir: &self.settings.output_dir,
                    secondary_output_dir: self.settings.packaged_dir.as_deref(),
                    package_allowlist: self.settings.package_allowlist.as_deref(),
                    import_path,
                };
                self.compiler.compile(&request, sink)
            }));
        }
        for edge in remove {
            units.push(Box::new(move || delete_outputs(edge)));
        }

        if let Err(fail) = self.executor.run_quick_fail(units) {
            self.discard_store();
            return Err(fail.into());
        }
        Ok(())
    }

    fn discard_store(&self) {
        if let Err(e) = self.store.delete() {
            warn!(error = %e, "failed to delete dependency store");
        }
    }

    /// Fingerprints every file under the source and import roots plus `extra`.
    fn snapshot(
        &self,
        scanner: &SourceScanner,
        extra: BTreeSet<PathBuf>,
    ) -> Result<Snapshot, CompileError> {
        let mut paths = extra;
        paths.extend(scanner.scan_all(&self.settings.source_dirs)?);
        paths.extend(scanner.scan_all(&self.settings.import_dirs)?);
        Ok(SourceHasher::hash_files(&paths)?)
    }

    fn commit(&self, mut store: DependencyStore, mut current: Snapshot) -> Result<(), CompileError> {
        let missing: Vec<PathBuf> = store
            .tracked_paths()
            .into_iter()
            .filter(|p| !current.contains_key(p))
            .collect();
        current.extend(SourceHasher::hash_files(&missing)?);
        store.set_inputs(current);
        store.set_config(self.config);
        self.store.save(&store)?;
        Ok(())
    }
}

fn clean_dir(dir: &Path) -> Result<(), CompileError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(CompileError::io(dir, e)),
    }
    std::fs::create_dir_all(dir).map_err(|e| CompileError::io(dir, e))
}

fn remove_output(path: &Path) -> Result<(), CompileError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CompileError::io(path, e)),
    }
}

fn delete_outputs(edge: &DependencyData) -> Result<(), CompileError> {
    debug!(file = %edge.main_file.display(), "deleting outputs of removed file");
    edge.all_outputs().try_for_each(|out| remove_output(out))
}

/// Deletes outputs of a previous compilation that the new one no longer produced.
fn delete_stale_outputs(old: &DependencyData, new: &DependencyData) -> Result<(), CompileError> {
    let kept: BTreeSet<&PathBuf> = new.all_outputs().collect();
    old.all_outputs()
        .filter(|out| !kept.contains(out))
        .try_for_each(|out| remove_output(out))
}
