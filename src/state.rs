//! Per-pack record of which content hashes are uploaded, and under which id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateEntry {
    /// Stable remote identifier (`file_unique_id`) of the sticker.
    pub tg_id: String,
}

/// Content hash -> remote sticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StickerState {
    entries: BTreeMap<String, StateEntry>,
}

impl StickerState {
    pub fn get(&self, hash: &str) -> Option<&StateEntry> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn insert(&mut self, hash: String, tg_id: String) {
        self.entries.insert(hash, StateEntry { tg_id });
    }

    pub fn remove(&mut self, hash: &str) -> Option<StateEntry> {
        self.entries.remove(hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("cannot access state file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {} is not valid JSON", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable storage of a [`StickerState`].
pub trait StateStore {
    fn load(&self) -> Result<StickerState, StateError>;
    fn save(&self, state: &StickerState) -> Result<(), StateError>;
}

/// JSON file, e.g. `stickerset_state_main.json`.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file of `pack` inside `work_dir`.
    pub fn for_pack(work_dir: &Path, pack: &str) -> Self {
        Self::new(work_dir.join(format!("stickerset_state_{pack}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for StateFile {
    fn load(&self) -> Result<StickerState, StateError> {
        let data = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        serde_json::from_str(&data).map_err(|source| StateError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes next to the target and renames over it, so a crash never
    /// leaves a half-written file behind.
    fn save(&self, state: &StickerState) -> Result<(), StateError> {
        let data = serde_json::to_string(state).map_err(|source| StateError::Json {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, data).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }
}
