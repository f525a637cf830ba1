//! Conformance test helpers for Recast.
//!
//! Provides a scripted compiler, on-disk project fixtures for both drivers,
//! and tree snapshots so integration tests can compare a sequence of
//! incremental runs against a single full run over the same inputs.

#![warn(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use recast_common::RunReport;
use recast_compile::{
    CompileError, CompileRequest, CompileSettings, DependencySink, FileCompiler,
    IncrementalCompiler,
};
use recast_config::{ContentKind, PackagingConfig};
use recast_exec::WorkExecutor;
use recast_merge::{IncrementalMerger, MergeError, MergeInput, MergeSettings, PackagingPolicy};
use recast_state::{DependencyData, DependencyStore, LoadOutcome, StateStore};
use tempfile::TempDir;

/// A compiler that concatenates a file with every file it imports.
///
/// Lines of the form `import <relative path>` are resolved against the
/// import path; the first match is read and appended. The output keeps the
/// file's path below its source root with a `.out` suffix, and a file named
/// in `fail_on` fails instead of compiling.
#[derive(Default)]
pub struct ImportCompiler {
    calls: Mutex<Vec<PathBuf>>,
    fail_on: BTreeSet<String>,
}

impl ImportCompiler {
    /// Creates a compiler that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes compiling any file named `name` fail.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_string());
        self
    }

    /// File names compiled since the last call, sorted.
    pub fn take_calls(&self) -> Vec<String> {
        let mut names: Vec<String> = std::mem::take(&mut *self.calls.lock())
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl FileCompiler for ImportCompiler {
    fn compile(&self, request: &CompileRequest<'_>, sink: &DependencySink) -> Result<(), CompileError> {
        let file = request.file;
        self.calls.lock().push(file.to_path_buf());
        let io = |path: &Path, source: std::io::Error| CompileError::Io {
            path: path.to_path_buf(),
            source,
        };

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_on.contains(&name) {
            return Err(CompileError::ToolFailed {
                file: file.to_path_buf(),
                status: "exit status: 1".into(),
                stderr: format!("{name}: scripted failure"),
            });
        }

        let text = fs::read_to_string(file).map_err(|e| io(file, e))?;
        let mut edge = DependencyData::new(file);
        let mut generated = text.clone();
        for line in text.lines() {
            let Some(import) = line.strip_prefix("import ") else {
                continue;
            };
            let found = request
                .import_path
                .iter()
                .map(|dir| dir.join(import.trim()))
                .find(|p| p.is_file());
            if let Some(dep) = found {
                generated.push_str(&fs::read_to_string(&dep).map_err(|e| io(&dep, e))?);
                edge.add_dependency(dep);
            }
        }

        let relative = file.strip_prefix(request.source_root).unwrap_or(file);
        let out = request.output_dir.join(format!("{}.out", relative.display()));
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| io(parent, e))?;
        }
        fs::write(&out, generated).map_err(|e| io(&out, e))?;
        edge.add_output(out);
        sink.record(edge);
        Ok(())
    }
}

/// A compile project in a temporary directory.
///
/// Layout: `src/` (source root), `imports/` (import-only root), `gen/`
/// (outputs) and `state/`.
pub struct CompileProject {
    tmp: TempDir,
    /// Settings pointing into the temporary directory.
    pub settings: CompileSettings,
}

impl CompileProject {
    /// Creates an empty project.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let root = tmp.path();
        let settings = CompileSettings {
            source_dirs: vec![root.join("src")],
            import_dirs: vec![root.join("imports")],
            source_glob: "**/*.aidl".into(),
            output_dir: root.join("gen"),
            packaged_dir: None,
            package_allowlist: None,
            state_dir: root.join("state"),
        };
        fs::create_dir_all(&settings.source_dirs[0]).expect("create src");
        fs::create_dir_all(&settings.import_dirs[0]).expect("create imports");
        Self { tmp, settings }
    }

    /// The project directory.
    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Writes a file relative to the project directory.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("create parent");
        fs::write(path, content).expect("write file");
    }

    /// Deletes a file relative to the project directory.
    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.root().join(relative)).expect("remove file");
    }

    /// Runs the compiler driver with `threads` workers.
    pub fn run(&self, compiler: &ImportCompiler, threads: usize) -> Result<RunReport, CompileError> {
        let executor = WorkExecutor::new(threads).expect("build pool");
        IncrementalCompiler::new(&self.settings, compiler, &executor).run()
    }

    /// The dependency store on disk.
    pub fn store(&self) -> StateStore<DependencyStore> {
        StateStore::new(self.settings.state_file())
    }

    /// Every output file, relative to `gen/`, with its content.
    pub fn outputs(&self) -> BTreeMap<String, String> {
        read_tree(&self.settings.output_dir)
    }

    /// The saved edges with paths relative to the project directory.
    pub fn edges(&self) -> BTreeMap<String, (Vec<String>, Vec<String>)> {
        let LoadOutcome::Loaded(store) = self.store().load() else {
            return BTreeMap::new();
        };
        let rel = |p: &Path| relative(self.root(), p);
        store
            .edges()
            .map(|edge| {
                (
                    rel(edge.main_file.as_path()),
                    (
                        edge.dependency_files.iter().map(|p| rel(p.as_path())).collect(),
                        edge.all_outputs().map(|p| rel(p.as_path())).collect(),
                    ),
                )
            })
            .collect()
    }
}

impl Default for CompileProject {
    fn default() -> Self {
        Self::new()
    }
}

/// A merge destination in a temporary directory.
pub struct MergeProject {
    _tmp: TempDir,
    /// Settings pointing into the temporary directory.
    pub settings: MergeSettings,
    /// Packaging configuration used for every run.
    pub packaging: PackagingConfig,
}

impl MergeProject {
    /// Creates a destination merging `content` with the default packaging rules.
    pub fn new(content: ContentKind) -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let settings = MergeSettings {
            content,
            output_dir: tmp.path().join("out"),
            state_dir: tmp.path().join("state"),
        };
        Self {
            _tmp: tmp,
            settings,
            packaging: PackagingConfig::default(),
        }
    }

    /// Runs the merge driver over `inputs` with `threads` workers.
    pub fn run(&self, inputs: &[&dyn MergeInput], threads: usize) -> Result<RunReport, MergeError> {
        let executor = WorkExecutor::new(threads).expect("build pool");
        let policy = PackagingPolicy::from_config(&self.packaging)?;
        IncrementalMerger::new(&self.settings, policy, &executor)?.run(inputs)
    }

    /// Every output file, relative to the output directory, with its content.
    pub fn outputs(&self) -> BTreeMap<String, String> {
        read_tree(&self.settings.output_dir)
    }

    /// Content of one output path, if present.
    pub fn output(&self, path: &str) -> Option<String> {
        fs::read_to_string(self.settings.output_dir.join(path)).ok()
    }
}

/// Reads every file below `dir` into a map keyed by `/`-separated relative path.
pub fn read_tree(dir: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    collect(dir, dir, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, files);
        } else if let Ok(content) = fs::read_to_string(&path) {
            files.insert(relative(root, &path), content);
        }
    }
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
