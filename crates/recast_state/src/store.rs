//! Loading, saving, and discarding one persisted state file.
//!
//! The `StateStore` ties the framed container to a single file path. Loading
//! is fail-safe: a missing file is [`LoadOutcome::NotFound`] and any problem
//! decoding an existing file is [`LoadOutcome::Corrupt`]. Both tell the caller
//! to perform a full run; neither is an error.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::container;
use crate::error::StateError;

/// A state model that can be persisted by a [`StateStore`].
pub trait PersistedState: Serialize + DeserializeOwned {
    /// Tag written into the container header so that one kind of state is
    /// never decoded as another.
    const KIND: &'static str;
}

/// Result of trying to load persisted state.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    /// The state file was read and fully validated.
    Loaded(T),
    /// No state file exists.
    NotFound,
    /// A state file exists but could not be decoded.
    Corrupt(StateError),
}

impl<T> LoadOutcome<T> {
    /// Returns the loaded state, discarding the reason for a miss.
    pub fn into_state(self) -> Option<T> {
        match self {
            Self::Loaded(state) => Some(state),
            Self::NotFound | Self::Corrupt(_) => None,
        }
    }

    /// Returns `true` if the state was loaded.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Persistent storage for one state file of kind `T`.
#[derive(Debug, Clone)]
pub struct StateStore<T> {
    path: PathBuf,
    _kind: PhantomData<fn() -> T>,
}

impl<T: PersistedState> StateStore<T> {
    /// Creates a store for the state file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _kind: PhantomData,
        }
    }

    /// The state file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the state file.
    ///
    /// Never fails: a missing file and an unreadable or invalid one are
    /// reported as outcomes so the caller can fall back to a full run.
    pub fn load(&self) -> LoadOutcome<T> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file");
                return LoadOutcome::NotFound;
            }
            Err(e) => return LoadOutcome::Corrupt(StateError::io(&self.path, e)),
        };

        match container::decode(T::KIND, &raw) {
            Ok(state) => LoadOutcome::Loaded(state),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable state");
                LoadOutcome::Corrupt(e)
            }
        }
    }

    /// Persists the state, replacing the previous file atomically.
    pub fn save(&self, state: &T) -> Result<(), StateError> {
        let bytes = container::encode(T::KIND, state)?;
        container::write_atomic(&self.path, &bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "saved state");
        Ok(())
    }

    /// Deletes the state file so that the next run is a full run.
    ///
    /// Deleting a file that does not exist succeeds.
    pub fn delete(&self) -> Result<(), StateError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::io(&self.path, e)),
        }
    }

    /// Returns `true` if a state file is present (valid or not).
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}
