//! Persisted state of the incremental merger.
//!
//! For every output path the merger produced, records the ordered names of
//! the inputs that contributed to it. For every input, records the fingerprint
//! of each path it offered, so a content change under an unchanged
//! contributor list is still detected on the next run. A fingerprint of the
//! packaging configuration ties the state to the rules that produced it.

use std::collections::BTreeMap;

use recast_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::classify::Snapshot;
use crate::store::PersistedState;

/// The merger's persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeState {
    /// Output path -> ordered contributor names used last time.
    outputs: BTreeMap<String, Vec<String>>,

    /// Contributor name -> fingerprints of the paths it offered.
    inputs: BTreeMap<String, Snapshot<String>>,

    /// Fingerprint of the content kind, packaging rules and input scopes.
    config: Option<ContentHash>,
}

impl PersistedState for MergeState {
    const KIND: &'static str = "merge-state";
}

impl MergeState {
    /// Creates an empty state, as used by a full run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the contributors recorded for an output path.
    pub fn contributors(&self, path: &str) -> Option<&[String]> {
        self.outputs.get(path).map(Vec::as_slice)
    }

    /// Records the ordered contributors of an output path.
    pub fn set_contributors(&mut self, path: impl Into<String>, names: Vec<String>) {
        self.outputs.insert(path.into(), names);
    }

    /// Forgets an output path that no surviving input contributes to.
    pub fn remove_path(&mut self, path: &str) -> Option<Vec<String>> {
        self.outputs.remove(path)
    }

    /// Iterates over all recorded output paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Returns the fingerprints recorded for an input, if it was seen before.
    pub fn input_fingerprints(&self, name: &str) -> Option<&Snapshot<String>> {
        self.inputs.get(name)
    }

    /// Replaces the fingerprints of every input with those of the current run.
    pub fn set_inputs(&mut self, inputs: BTreeMap<String, Snapshot<String>>) {
        self.inputs = inputs;
    }

    /// The configuration fingerprint recorded by the run that saved this state.
    pub fn config(&self) -> Option<&ContentHash> {
        self.config.as_ref()
    }

    /// Records the configuration fingerprint of the current run.
    pub fn set_config(&mut self, config: ContentHash) {
        self.config = Some(config);
    }

    /// Number of output paths tracked.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns `true` if no output path is tracked.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
