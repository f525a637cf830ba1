//! Merge inputs and the views that rename or filter them.
//!
//! A [`MergeInput`] is an ordered listing of relative paths (always
//! `/`-separated) with a byte stream per path. [`RenamedInput`] and
//! [`FilteredInput`] wrap another input without copying any content.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use recast_common::ContentHash;
use recast_config::Scope;
use recast_state::SourceHasher;

use crate::accept::PathFilter;
use crate::error::MergeError;

/// One contributor to the merge.
pub trait MergeInput: Send + Sync {
    /// Unique name, recorded in the merge state.
    fn name(&self) -> &str;

    /// Origin tier of this input.
    fn scope(&self) -> Scope;

    /// Whether the input is backed by a directory tree.
    fn is_directory(&self) -> bool;

    /// Every path offered, sorted.
    fn paths(&self) -> Vec<String>;

    /// Content fingerprint of `path`, or `None` if it is not offered.
    fn fingerprint(&self, path: &str) -> Option<ContentHash>;

    /// Opens the bytes of `path`.
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, MergeError>;
}

impl<T: MergeInput + ?Sized> MergeInput for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn scope(&self) -> Scope {
        (**self).scope()
    }

    fn is_directory(&self) -> bool {
        (**self).is_directory()
    }

    fn paths(&self) -> Vec<String> {
        (**self).paths()
    }

    fn fingerprint(&self, path: &str) -> Option<ContentHash> {
        (**self).fingerprint(path)
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, MergeError> {
        (**self).open(path)
    }
}

fn missing(input: &dyn MergeInput, path: &str) -> MergeError {
    MergeError::MissingPath {
        input: input.name().to_string(),
        path: path.to_string(),
    }
}

/// A directory tree on disk, fingerprinted when scanned.
#[derive(Debug, Clone)]
pub struct DirectoryInput {
    name: String,
    scope: Scope,
    root: PathBuf,
    entries: BTreeMap<String, ContentHash>,
}

impl DirectoryInput {
    /// Lists and fingerprints every file below `root`. A missing root is an
    /// empty input.
    pub fn scan(name: impl Into<String>, scope: Scope, root: impl Into<PathBuf>) -> Result<Self, MergeError> {
        let root = root.into();
        let mut entries = BTreeMap::new();
        if root.is_dir() {
            walk_dir(&root, &root, &mut entries)?;
        }
        Ok(Self {
            name: name.into(),
            scope,
            root,
            entries,
        })
    }

    /// The scanned directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    entries: &mut BTreeMap<String, ContentHash>,
) -> Result<(), MergeError> {
    let listing = std::fs::read_dir(dir).map_err(|e| MergeError::io(dir, e))?;
    for entry in listing {
        let path = entry.map_err(|e| MergeError::io(dir, e))?.path();
        if path.is_dir() {
            walk_dir(root, &path, entries)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.insert(key, SourceHasher::hash_file(&path)?);
        }
    }
    Ok(())
}

impl MergeInput for DirectoryInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn is_directory(&self) -> bool {
        true
    }

    fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn fingerprint(&self, path: &str) -> Option<ContentHash> {
        self.entries.get(path).copied()
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, MergeError> {
        if !self.entries.contains_key(path) {
            return Err(missing(self, path));
        }
        let file_path = self.root.join(path);
        let file = std::fs::File::open(&file_path).map_err(|e| MergeError::io(&file_path, e))?;
        Ok(Box::new(file))
    }
}

/// Content held in memory, such as entries already read out of an archive.
#[derive(Debug, Clone)]
pub struct MemoryInput {
    name: String,
    scope: Scope,
    directory: bool,
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryInput {
    /// Creates an empty, non-directory input.
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
            directory: false,
            files: BTreeMap::new(),
        }
    }

    /// Adds a file.
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), bytes.into());
        self
    }

    /// Marks the input as directory-backed, so native library paths get the
    /// `lib/` prefix.
    pub fn as_directory(mut self) -> Self {
        self.directory = true;
        self
    }
}

impl MergeInput for MemoryInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn is_directory(&self) -> bool {
        self.directory
    }

    fn paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn fingerprint(&self, path: &str) -> Option<ContentHash> {
        self.files.get(path).map(|b| ContentHash::from_bytes(b))
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, MergeError> {
        let bytes = self.files.get(path).ok_or_else(|| missing(self, path))?;
        Ok(Box::new(Cursor::new(bytes.as_slice())))
    }
}

/// Prefixes every path of another input.
///
/// Lookups strip the prefix again before reaching the wrapped input.
pub struct RenamedInput<'a> {
    inner: &'a dyn MergeInput,
    prefix: String,
}

impl<'a> RenamedInput<'a> {
    /// Wraps `inner`, exposing `path` as `prefix + path`.
    pub fn new(inner: &'a dyn MergeInput, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn original<'p>(&self, path: &'p str) -> Option<&'p str> {
        path.strip_prefix(self.prefix.as_str())
    }
}

impl MergeInput for RenamedInput<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn scope(&self) -> Scope {
        self.inner.scope()
    }

    fn is_directory(&self) -> bool {
        self.inner.is_directory()
    }

    fn paths(&self) -> Vec<String> {
        self.inner
            .paths()
            .into_iter()
            .map(|p| format!("{}{p}", self.prefix))
            .collect()
    }

    fn fingerprint(&self, path: &str) -> Option<ContentHash> {
        self.inner.fingerprint(self.original(path)?)
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, MergeError> {
        match self.original(path) {
            Some(original) => self.inner.open(original),
            None => Err(missing(self, path)),
        }
    }
}

/// Hides every path of another input that a [`PathFilter`] rejects.
pub struct FilteredInput<'a> {
    inner: Box<dyn MergeInput + 'a>,
    filter: &'a PathFilter,
}

impl<'a> FilteredInput<'a> {
    /// Wraps `inner`. The box holds a reference or a thin view, never content.
    pub fn new(inner: Box<dyn MergeInput + 'a>, filter: &'a PathFilter) -> Self {
        Self { inner, filter }
    }
}

impl MergeInput for FilteredInput<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn scope(&self) -> Scope {
        self.inner.scope()
    }

    fn is_directory(&self) -> bool {
        self.inner.is_directory()
    }

    fn paths(&self) -> Vec<String> {
        let mut paths = self.inner.paths();
        paths.retain(|p| self.filter.accepts(p));
        paths
    }

    fn fingerprint(&self, path: &str) -> Option<ContentHash> {
        if self.filter.accepts(path) {
            self.inner.fingerprint(path)
        } else {
            None
        }
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, MergeError> {
        if self.filter.accepts(path) {
            self.inner.open(path)
        } else {
            Err(missing(self, path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accept::ContentRules;
    use crate::policy::PackagingPolicy;
    use recast_config::{ContentKind, PackagingConfig};
    use std::fs;

    fn read_all(input: &dyn MergeInput, path: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        input.open(path).unwrap().read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn directory_lists_relative_slash_paths() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("x86/sub")).unwrap();
        fs::write(tmp.path().join("x86/libfoo.so"), b"elf").unwrap();
        fs::write(tmp.path().join("x86/sub/data.bin"), b"data").unwrap();

        let input = DirectoryInput::scan("jni", Scope::Project, tmp.path()).unwrap();
        assert_eq!(input.paths(), vec!["x86/libfoo.so", "x86/sub/data.bin"]);
        assert_eq!(read_all(&input, "x86/libfoo.so"), b"elf");
        assert_eq!(
            input.fingerprint("x86/sub/data.bin"),
            Some(ContentHash::from_bytes(b"data"))
        );
        assert!(input.is_directory());
    }

    #[test]
    fn missing_directory_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let input = DirectoryInput::scan("gone", Scope::External, tmp.path().join("gone")).unwrap();
        assert!(input.paths().is_empty());
    }

    #[test]
    fn unknown_path_is_missing() {
        let input = MemoryInput::new("m", Scope::External).with_file("a", "1");
        assert!(matches!(
            input.open("b"),
            Err(MergeError::MissingPath { .. })
        ));
    }

    #[test]
    fn rename_round_trips_lookups() {
        let base = MemoryInput::new("jni", Scope::Project).with_file("arm64-v8a/libx.so", "so");
        let renamed = RenamedInput::new(&base, "lib/");
        assert_eq!(renamed.paths(), vec!["lib/arm64-v8a/libx.so"]);
        assert_eq!(read_all(&renamed, "lib/arm64-v8a/libx.so"), b"so");
        assert!(renamed.fingerprint("arm64-v8a/libx.so").is_none());
        assert_eq!(renamed.name(), "jni");
    }

    #[test]
    fn filter_hides_rejected_paths() {
        let policy = PackagingPolicy::from_config(&PackagingConfig::default()).unwrap();
        let filter = PathFilter::new(ContentRules::new(ContentKind::Resources).unwrap(), policy);
        let base = MemoryInput::new("dep", Scope::External)
            .with_file("a/B.class", "cls")
            .with_file("META-INF/LICENSE", "mit")
            .with_file("res/strings.txt", "hi");
        let filtered = FilteredInput::new(Box::new(&base), &filter);
        assert_eq!(filtered.paths(), vec!["res/strings.txt"]);
        assert!(filtered.fingerprint("a/B.class").is_none());
        assert!(filtered.open("META-INF/LICENSE").is_err());
        assert_eq!(read_all(&filtered, "res/strings.txt"), b"hi");
    }
}
