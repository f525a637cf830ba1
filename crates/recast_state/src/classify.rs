//! Fingerprinting and change classification.
//!
//! A [`Snapshot`] maps each input path to its content fingerprint. Comparing
//! the snapshot recorded by the previous run with a fresh one yields a
//! [`ChangeMap`]: every path that is new, changed, or removed. Unchanged paths
//! are omitted, so an empty map means there is no work to do.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use recast_common::{ContentHash, FileStatus};

use crate::error::StateError;

/// Content fingerprints keyed by path.
pub type Snapshot<K = PathBuf> = BTreeMap<K, ContentHash>;

/// Paths whose fingerprint differs from the previous run, with their status.
pub type ChangeMap<K = PathBuf> = BTreeMap<K, FileStatus>;

/// Computes content fingerprints for files on disk.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the fingerprint of a single file.
    pub fn hash_file(path: &Path) -> Result<ContentHash, StateError> {
        let file = std::fs::File::open(path).map_err(|e| StateError::io(path, e))?;
        ContentHash::from_reader(file).map_err(|e| StateError::io(path, e))
    }

    /// Computes fingerprints for multiple files.
    ///
    /// Files that no longer exist are left out of the snapshot, so they show
    /// up as removed when classified. Any other read error is propagated: an
    /// unreadable file must not be mistaken for a deleted one.
    pub fn hash_files<'a, I>(paths: I) -> Result<Snapshot, StateError>
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        let mut snapshot = Snapshot::new();
        for path in paths {
            match Self::hash_file(path) {
                Ok(hash) => {
                    snapshot.insert(path.clone(), hash);
                }
                Err(StateError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(snapshot)
    }
}

/// Compares the current snapshot against the previous one.
///
/// Paths only in `current` are [`FileStatus::New`], paths in both with a
/// different fingerprint are [`FileStatus::Changed`], and paths only in
/// `previous` are [`FileStatus::Removed`]. Identical fingerprints are omitted.
pub fn classify<K: Ord + Clone>(
    previous: &BTreeMap<K, ContentHash>,
    current: &BTreeMap<K, ContentHash>,
) -> ChangeMap<K> {
    let mut changes = ChangeMap::new();

    for (path, hash) in current {
        match previous.get(path) {
            Some(old) if old == hash => {}
            Some(_) => {
                changes.insert(path.clone(), FileStatus::Changed);
            }
            None => {
                changes.insert(path.clone(), FileStatus::New);
            }
        }
    }

    for path in previous.keys() {
        if !current.contains_key(path) {
            changes.insert(path.clone(), FileStatus::Removed);
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(entries: &[(&str, &[u8])]) -> Snapshot<String> {
        entries
            .iter()
            .map(|(p, c)| (p.to_string(), ContentHash::from_bytes(c)))
            .collect()
    }

    #[test]
    fn hash_file_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IFoo.aidl");
        std::fs::write(&path, "interface IFoo {}").unwrap();

        let h1 = SourceHasher::hash_file(&path).unwrap();
        let h2 = SourceHasher::hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1, ContentHash::from_bytes(b"interface IFoo {}"));
    }

    #[test]
    fn hash_file_nonexistent_errors() {
        let result = SourceHasher::hash_file(Path::new("/nonexistent/IFoo.aidl"));
        assert!(matches!(result, Err(StateError::Io { .. })));
    }

    #[test]
    fn hash_files_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.aidl");
        let gone = dir.path().join("gone.aidl");
        std::fs::write(&a, "a").unwrap();

        let snapshot = SourceHasher::hash_files(&[a.clone(), gone.clone()]).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&a));
        assert!(!snapshot.contains_key(&gone));
    }

    #[test]
    fn classify_all_new() {
        let previous = Snapshot::<String>::new();
        let current = snap(&[("a", b"1"), ("b", b"2")]);
        let changes = classify(&previous, &current);
        assert_eq!(changes.len(), 2);
        assert!(changes.values().all(|s| *s == FileStatus::New));
    }

    #[test]
    fn classify_unchanged_is_omitted() {
        let previous = snap(&[("a", b"1")]);
        let current = snap(&[("a", b"1")]);
        assert!(classify(&previous, &current).is_empty());
    }

    #[test]
    fn classify_changed() {
        let previous = snap(&[("a", b"old")]);
        let current = snap(&[("a", b"new")]);
        let changes = classify(&previous, &current);
        assert_eq!(changes.get("a"), Some(&FileStatus::Changed));
    }

    #[test]
    fn classify_removed_is_never_dropped() {
        let previous = snap(&[("a", b"1"), ("b", b"2")]);
        let current = snap(&[("a", b"1")]);
        let changes = classify(&previous, &current);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("b"), Some(&FileStatus::Removed));
    }

    #[test]
    fn classify_mixed() {
        let previous = snap(&[("keep", b"k"), ("edit", b"v1"), ("drop", b"d")]);
        let current = snap(&[("keep", b"k"), ("edit", b"v2"), ("add", b"a")]);
        let changes = classify(&previous, &current);
        assert_eq!(changes.get("edit"), Some(&FileStatus::Changed));
        assert_eq!(changes.get("drop"), Some(&FileStatus::Removed));
        assert_eq!(changes.get("add"), Some(&FileStatus::New));
        assert!(!changes.contains_key("keep"));
    }
}
