//! The per-file compile operation and its command-line implementation.

use std::path::{Path, PathBuf};
use std::process::Command;

use recast_common::ContentHash;
use recast_state::DependencyData;
use tracing::{debug, warn};

use crate::error::CompileError;
use crate::sink::DependencySink;

/// Everything needed to compile one main file.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// The configured source root containing `file`.
    pub source_root: &'a Path,
    /// The main file to compile.
    pub file: &'a Path,
    /// Directory receiving generated sources.
    pub output_dir: &'a Path,
    /// Directory receiving packaged copies of eligible sources.
    pub secondary_output_dir: Option<&'a Path>,
    /// Package prefixes eligible for packaging; `None` accepts every package.
    pub package_allowlist: Option<&'a [String]>,
    /// Directories searched for imports, in order.
    pub import_path: &'a [PathBuf],
}

impl CompileRequest<'_> {
    /// The dotted package of `file`, derived from its directory relative to
    /// the source root.
    pub fn package(&self) -> Option<String> {
        let parent = self.file.parent()?.strip_prefix(self.source_root).ok()?;
        let segments: Vec<_> = parent
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        Some(segments.join("."))
    }

    /// Returns `true` if this file should also produce a packaged copy.
    pub fn package_allowed(&self) -> bool {
        if self.secondary_output_dir.is_none() {
            return false;
        }
        match (self.package_allowlist, self.package()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(list), Some(package)) => list.iter().any(|p| package.starts_with(p.as_str())),
        }
    }
}

/// Compiles a single main file.
///
/// Implementations must report exactly one [`DependencyData`] for the file
/// through `sink`, listing every dependency read and every output written.
pub trait FileCompiler: Sync {
    /// Compiles `request.file`.
    fn compile(&self, request: &CompileRequest<'_>, sink: &DependencySink)
        -> Result<(), CompileError>;

    /// Describes the compiler and its options. A change invalidates the
    /// dependency store of earlier runs.
    fn identity(&self) -> String {
        String::new()
    }
}

/// Runs an external compiler process once per main file.
///
/// The tool is invoked as
/// `<tool> <args..> -I<import>.. -d<depfile> -o<output_dir> <file>` and must
/// write a Make-style dependency file to the `-d` location.
#[derive(Debug, Clone)]
pub struct ToolCompiler {
    tool: String,
    args: Vec<String>,
    depfile_dir: PathBuf,
}

impl ToolCompiler {
    /// Creates a compiler that writes its dependency files into `depfile_dir`.
    pub fn new(tool: impl Into<String>, args: Vec<String>, depfile_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            args,
            depfile_dir: depfile_dir.into(),
        }
    }

    /// Location of the dependency file written for `file`.
    pub fn depfile_for(&self, file: &Path) -> PathBuf {
        let key = ContentHash::from_bytes(file.as_os_str().as_encoded_bytes());
        self.depfile_dir.join(format!("{key}.d"))
    }

    /// The argument list passed to the tool for `request`.
    pub fn build_args(&self, request: &CompileRequest<'_>, depfile: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        for dir in request.import_path {
            args.push(format!("-I{}", dir.display()));
        }
        args.push(format!("-d{}", depfile.display()));
        args.push(format!("-o{}", request.output_dir.display()));
        args.push(request.file.display().to_string());
        args
    }

    fn package_copy(&self, request: &CompileRequest<'_>) -> Result<Option<PathBuf>, CompileError> {
        let Some(dir) = request.secondary_output_dir.filter(|_| request.package_allowed()) else {
            return Ok(None);
        };
        let rel = request
            .file
            .strip_prefix(request.source_root)
            .map_err(|_| CompileError::OutsideSourceRoots {
                path: request.file.to_path_buf(),
            })?;
        let dest = dir.join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
        }
        std::fs::copy(request.file, &dest).map_err(|e| CompileError::io(&dest, e))?;
        Ok(Some(dest))
    }
}

impl FileCompiler for ToolCompiler {
    fn compile(
        &self,
        request: &CompileRequest<'_>,
        sink: &DependencySink,
    ) -> Result<(), CompileError> {
        std::fs::create_dir_all(&self.depfile_dir)
            .map_err(|e| CompileError::io(&self.depfile_dir, e))?;
        let depfile = self.depfile_for(request.file);
        let args = self.build_args(request, &depfile);
        debug!(tool = %self.tool, file = %request.file.display(), "invoking compiler");

        let output = Command::new(&self.tool)
            .args(&args)
            .output()
            .map_err(|source| CompileError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(CompileError::ToolFailed {
                file: request.file.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut edge = DependencyData::new(request.file);
        match std::fs::read_to_string(&depfile) {
            Ok(text) => match DependencyData::parse_depfile(&text) {
                Some(parsed) => {
                    for dep in parsed.dependency_files {
                        edge.add_dependency(dep);
                    }
                    for out in parsed.output_files {
                        edge.add_output(out);
                    }
                }
                None => warn!(depfile = %depfile.display(), "dependency file names no source"),
            },
            Err(e) => warn!(depfile = %depfile.display(), error = %e, "no dependency file written"),
        }
        if let Err(e) = std::fs::remove_file(&depfile) {
            debug!(depfile = %depfile.display(), error = %e, "dependency file not removed");
        }

        if let Some(copy) = self.package_copy(request)? {
            edge.add_secondary_output(copy);
        }
        sink.record(edge);
        Ok(())
    }

    fn identity(&self) -> String {
        std::iter::once(self.tool.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\0")
    }
}
