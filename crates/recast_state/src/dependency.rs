//! Dependency edges recorded by the incremental compiler.
//!
//! Each compiled main file owns exactly one [`DependencyData`] edge listing the
//! dependency files its compilation read and the output files it produced.
//! [`DependencyStore`] keeps those edges together with the input snapshot of
//! the run that produced them, and derives two indices from the edges:
//! main file to edge, and dependency file to the main files that read it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use recast_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::classify::Snapshot;
use crate::store::PersistedState;

/// What a single compilation of a main file read and wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyData {
    /// The compiled source file.
    pub main_file: PathBuf,

    /// Files read while compiling `main_file` (imports), excluding itself.
    pub dependency_files: BTreeSet<PathBuf>,

    /// Primary outputs (generated sources).
    pub output_files: Vec<PathBuf>,

    /// Secondary outputs (e.g. packaged copies of the source).
    pub secondary_output_files: Vec<PathBuf>,
}

impl DependencyData {
    /// Creates an edge for `main_file` with no dependencies or outputs yet.
    pub fn new(main_file: impl Into<PathBuf>) -> Self {
        Self {
            main_file: main_file.into(),
            dependency_files: BTreeSet::new(),
            output_files: Vec::new(),
            secondary_output_files: Vec::new(),
        }
    }

    /// Records a dependency file. The main file itself is never a dependency.
    pub fn add_dependency(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if path != self.main_file {
            self.dependency_files.insert(path);
        }
    }

    /// Records a primary output file.
    pub fn add_output(&mut self, path: impl Into<PathBuf>) {
        self.output_files.push(path.into());
    }

    /// Records a secondary output file.
    pub fn add_secondary_output(&mut self, path: impl Into<PathBuf>) {
        self.secondary_output_files.push(path.into());
    }

    /// Iterates over primary then secondary outputs.
    pub fn all_outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.output_files
            .iter()
            .chain(self.secondary_output_files.iter())
    }
}

/// On-disk shape of [`DependencyStore`]: edges, snapshot and settings fingerprint.
#[derive(Serialize, Deserialize)]
struct StoreRepr {
    edges: Vec<DependencyData>,
    inputs: Snapshot,
    config: Option<ContentHash>,
}

/// The compiler's persisted state.
///
/// Only the edges and the input snapshot are serialized; both indices are
/// rebuilt on deserialization, so a loaded store is consistent by construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoreRepr", into = "StoreRepr")]
pub struct DependencyStore {
    /// Main file -> its edge.
    main_files: BTreeMap<PathBuf, DependencyData>,

    /// Dependency file -> main files whose edge lists it.
    dependents: BTreeMap<PathBuf, BTreeSet<PathBuf>>,

    /// Fingerprints of every input seen by the run that produced this state.
    inputs: Snapshot,

    /// Fingerprint of the settings and compiler used by that run.
    config: Option<ContentHash>,
}

impl From<StoreRepr> for DependencyStore {
    fn from(repr: StoreRepr) -> Self {
        let mut store = Self {
            inputs: repr.inputs,
            config: repr.config,
            ..Self::default()
        };
        store.update_all(repr.edges);
        store
    }
}

impl From<DependencyStore> for StoreRepr {
    fn from(store: DependencyStore) -> Self {
        Self {
            edges: store.main_files.into_values().collect(),
            inputs: store.inputs,
            config: store.config,
        }
    }
}

impl PersistedState for DependencyStore {
    const KIND: &'static str = "dependency-store";
}

impl DependencyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces edges. An edge for an already known main file
    /// replaces the old one wholesale, including its reverse-index entries.
    pub fn update_all(&mut self, edges: impl IntoIterator<Item = DependencyData>) {
        for edge in edges {
            self.remove(&edge.main_file);
            for dep in &edge.dependency_files {
                self.dependents
                    .entry(dep.clone())
                    .or_default()
                    .insert(edge.main_file.clone());
            }
            self.main_files.insert(edge.main_file.clone(), edge);
        }
    }

    /// Drops the edge of `main_file`, returning it if it existed.
    pub fn remove(&mut self, main_file: &Path) -> Option<DependencyData> {
        let edge = self.main_files.remove(main_file)?;
        for dep in &edge.dependency_files {
            if let Some(mains) = self.dependents.get_mut(dep) {
                mains.remove(main_file);
                if mains.is_empty() {
                    self.dependents.remove(dep);
                }
            }
        }
        Some(edge)
    }

    /// Returns the edge of a main file.
    pub fn edge(&self, main_file: &Path) -> Option<&DependencyData> {
        self.main_files.get(main_file)
    }

    /// Returns `true` if `path` is a main file with a recorded edge.
    pub fn is_main_file(&self, path: &Path) -> bool {
        self.main_files.contains_key(path)
    }

    /// Returns every main file whose edge lists `path` as a dependency.
    ///
    /// An untracked path yields an empty iterator.
    pub fn dependents_of<'a>(&'a self, path: &Path) -> impl Iterator<Item = &'a PathBuf> + 'a {
        self.dependents.get(path).into_iter().flatten()
    }

    /// Iterates over all edges in main-file order.
    pub fn edges(&self) -> impl Iterator<Item = &DependencyData> {
        self.main_files.values()
    }

    /// Every path the store knows about: main files and dependency files.
    pub fn tracked_paths(&self) -> BTreeSet<PathBuf> {
        self.main_files
            .keys()
            .chain(self.dependents.keys())
            .cloned()
            .collect()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.main_files.len()
    }

    /// Returns `true` if no edge is recorded.
    pub fn is_empty(&self) -> bool {
        self.main_files.is_empty()
    }

    /// The input snapshot of the run that produced this state.
    pub fn inputs(&self) -> &Snapshot {
        &self.inputs
    }

    /// Replaces the input snapshot.
    pub fn set_inputs(&mut self, inputs: Snapshot) {
        self.inputs = inputs;
    }

    /// The settings fingerprint recorded by the run that produced this state.
    pub fn config(&self) -> Option<&ContentHash> {
        self.config.as_ref()
    }

    /// Records the settings fingerprint of the current run.
    pub fn set_config(&mut self, config: ContentHash) {
        self.config = Some(config);
    }

    /// Checks that the reverse index matches the edges exactly.
    pub fn is_consistent(&self) -> bool {
        let mut expected: BTreeMap<&PathBuf, BTreeSet<&PathBuf>> = BTreeMap::new();
        for edge in self.main_files.values() {
            for dep in &edge.dependency_files {
                expected.entry(dep).or_default().insert(&edge.main_file);
            }
        }
        expected.len() == self.dependents.len()
            && expected.iter().all(|(dep, mains)| {
                self.dependents
                    .get(*dep)
                    .is_some_and(|actual| actual.iter().eq(mains.iter().copied()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container;

    fn edge(main: &str, deps: &[&str], outs: &[&str]) -> DependencyData {
        let mut data = DependencyData::new(main);
        for d in deps {
            data.add_dependency(*d);
        }
        for o in outs {
            data.add_output(*o);
        }
        data
    }

    #[test]
    fn main_file_is_not_its_own_dependency() {
        let mut data = DependencyData::new("src/A.aidl");
        data.add_dependency("src/A.aidl");
        data.add_dependency("src/D.aidl");
        assert_eq!(data.dependency_files.len(), 1);
    }

    #[test]
    fn shared_dependency_maps_to_every_main() {
        let mut store = DependencyStore::new();
        store.update_all([
            edge("A", &["D"], &["A.out"]),
            edge("B", &["D"], &["B.out"]),
            edge("C", &[], &["C.out"]),
        ]);
        let mains: Vec<_> = store.dependents_of(Path::new("D")).collect();
        assert_eq!(mains, vec![&PathBuf::from("A"), &PathBuf::from("B")]);
        assert!(store.is_consistent());
    }

    #[test]
    fn untracked_dependency_is_empty() {
        let store = DependencyStore::new();
        assert_eq!(store.dependents_of(Path::new("nothing")).count(), 0);
    }

    #[test]
    fn update_replaces_edge_wholesale() {
        let mut store = DependencyStore::new();
        store.update_all([edge("A", &["D1"], &["A.out"])]);
        store.update_all([edge("A", &["D2"], &["A2.out"])]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.dependents_of(Path::new("D1")).count(), 0);
        assert_eq!(store.dependents_of(Path::new("D2")).count(), 1);
        assert_eq!(
            store.edge(Path::new("A")).unwrap().output_files,
            vec![PathBuf::from("A2.out")]
        );
        assert!(store.is_consistent());
    }

    #[test]
    fn remove_drops_reverse_entries() {
        let mut store = DependencyStore::new();
        store.update_all([edge("A", &["D"], &[]), edge("B", &["D"], &[])]);
        let removed = store.remove(Path::new("A")).unwrap();
        assert_eq!(removed.main_file, PathBuf::from("A"));
        assert_eq!(store.dependents_of(Path::new("D")).count(), 1);
        store.remove(Path::new("B"));
        assert!(store.tracked_paths().is_empty());
        assert!(store.is_consistent());
    }

    #[test]
    fn container_roundtrip_rebuilds_indices() {
        let mut store = DependencyStore::new();
        store.update_all([edge("A", &["D"], &["A.out"]), edge("B", &["D"], &["B.out"])]);
        let mut inputs = Snapshot::new();
        inputs.insert(PathBuf::from("A"), ContentHash::from_bytes(b"a"));
        store.set_inputs(inputs.clone());
        store.set_config(ContentHash::from_bytes(b"settings"));

        let bytes = container::encode(DependencyStore::KIND, &store).unwrap();
        let back: DependencyStore = container::decode(DependencyStore::KIND, &bytes).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.dependents_of(Path::new("D")).count(), 2);
        assert_eq!(back.inputs(), &inputs);
        assert_eq!(back.config(), Some(&ContentHash::from_bytes(b"settings")));
        assert!(back.is_consistent());
    }

    #[test]
    fn all_outputs_lists_primary_then_secondary() {
        let mut data = DependencyData::new("A");
        data.add_output("gen/A.java");
        data.add_secondary_output("packaged/A.aidl");
        let outs: Vec<_> = data.all_outputs().collect();
        assert_eq!(
            outs,
            vec![
                &PathBuf::from("gen/A.java"),
                &PathBuf::from("packaged/A.aidl")
            ]
        );
    }
}
