#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use sticker_sync::assets::AssetSource;
use sticker_sync::definitions::Definition;
use sticker_sync::remote::{ApiError, RemoteSticker, StickerApi, StickerSet};
use sticker_sync::state::{StateError, StateStore, StickerState};

/// In-memory sticker platform. Every mutating call is recorded.
#[derive(Default)]
pub struct FakeApi {
    sets: RefCell<HashMap<String, StickerSet>>,
    uploads: RefCell<HashMap<String, Vec<u8>>>,
    next_id: Cell<u32>,
    pub calls: RefCell<Vec<String>>,
    /// Uploads of these bytes fail.
    pub broken_images: RefCell<HashSet<Vec<u8>>>,
    /// `getStickerSet` fails transiently this many times first.
    pub flaky_lookups: Cell<u32>,
    pub fail_create: Cell<bool>,
    pub fail_delete: Cell<bool>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    /// Ids of the stickers in `set`, in order.
    pub fn sticker_ids(&self, set: &str) -> Vec<String> {
        self.sets
            .borrow()
            .get(set)
            .map(|set| set.stickers.iter().map(|s| s.file_unique_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn emojis(&self, set: &str) -> Vec<String> {
        self.sets.borrow()[set]
            .stickers
            .iter()
            .map(|s| s.emoji.clone().unwrap_or_default())
            .collect()
    }

    pub fn has_set(&self, set: &str) -> bool {
        self.sets.borrow().contains_key(set)
    }

    /// A sticker added by someone else.
    pub fn inject_sticker(&self, set: &str) -> String {
        let id = self.next();
        let sticker = RemoteSticker {
            file_id: format!("file{id}"),
            file_unique_id: format!("uniq{id}"),
            emoji: Some("👻".to_string()),
        };
        self.sets
            .borrow_mut()
            .get_mut(set)
            .unwrap()
            .stickers
            .push(sticker);
        format!("uniq{id}")
    }

    /// Mutating calls, i.e. everything except lookups.
    pub fn mutations(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn sticker(&self, file_id: &str, emoji: &str) -> Result<RemoteSticker, ApiError> {
        if !self.uploads.borrow().contains_key(file_id) {
            return Err(ApiError::Api {
                code: 400,
                description: "Bad Request: invalid file_id".to_string(),
            });
        }
        let id = self.next();
        Ok(RemoteSticker {
            file_id: format!("file{id}"),
            file_unique_id: format!("uniq{id}"),
            emoji: Some(emoji.to_string()),
        })
    }
}

impl StickerApi for FakeApi {
    fn bot_username(&self) -> Result<String, ApiError> {
        Ok("testbot".to_string())
    }

    fn get_sticker_set(&self, name: &str) -> Result<Option<StickerSet>, ApiError> {
        if self.flaky_lookups.get() > 0 {
            self.flaky_lookups.set(self.flaky_lookups.get() - 1);
            return Err(ApiError::Api {
                code: 502,
                description: "Bad Gateway".to_string(),
            });
        }
        Ok(self.sets.borrow().get(name).cloned())
    }

    fn upload_sticker_file(&self, _owner: i64, png: Vec<u8>) -> Result<String, ApiError> {
        if self.broken_images.borrow().contains(&png) {
            return Err(ApiError::Api {
                code: 400,
                description: "Bad Request: STICKER_PNG_DIMENSIONS".to_string(),
            });
        }
        let file_id = format!("upload{}", self.next());
        self.calls.borrow_mut().push(format!("upload {file_id}"));
        self.uploads.borrow_mut().insert(file_id.clone(), png);
        Ok(file_id)
    }

    fn create_new_sticker_set(
        &self,
        _owner: i64,
        name: &str,
        title: &str,
        file_id: &str,
        emoji: &str,
    ) -> Result<(), ApiError> {
        if self.fail_create.get() {
            return Err(ApiError::Api {
                code: 400,
                description: "Bad Request: PEER_ID_INVALID".to_string(),
            });
        }
        let sticker = self.sticker(file_id, emoji)?;
        self.calls.borrow_mut().push(format!("create {name}"));
        self.sets.borrow_mut().insert(
            name.to_string(),
            StickerSet {
                name: name.to_string(),
                title: title.to_string(),
                stickers: vec![sticker],
            },
        );
        Ok(())
    }

    fn add_sticker_to_set(
        &self,
        _owner: i64,
        name: &str,
        file_id: &str,
        emoji: &str,
    ) -> Result<(), ApiError> {
        let sticker = self.sticker(file_id, emoji)?;
        self.calls
            .borrow_mut()
            .push(format!("add {}", sticker.file_unique_id));
        self.sets
            .borrow_mut()
            .get_mut(name)
            .ok_or_else(|| ApiError::Api {
                code: 400,
                description: "Bad Request: STICKERSET_INVALID".to_string(),
            })?
            .stickers
            .push(sticker);
        Ok(())
    }

    fn delete_sticker_from_set(&self, file_id: &str) -> Result<(), ApiError> {
        if self.fail_delete.get() {
            return Err(ApiError::Api {
                code: 500,
                description: "Internal Server Error".to_string(),
            });
        }
        let mut sets = self.sets.borrow_mut();
        for set in sets.values_mut() {
            if let Some(index) = set.stickers.iter().position(|s| s.file_id == file_id) {
                let sticker = set.stickers.remove(index);
                self.calls
                    .borrow_mut()
                    .push(format!("delete {}", sticker.file_unique_id));
                return Ok(());
            }
        }
        Err(ApiError::Api {
            code: 400,
            description: "Bad Request: STICKER_INVALID".to_string(),
        })
    }
}

/// Images kept in memory.
#[derive(Default)]
pub struct MemAssets {
    pub images: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemAssets {
    pub fn with(images: &[(&str, &str)]) -> Self {
        let assets = Self::default();
        for (id, bytes) in images {
            assets.set(id, bytes.as_bytes());
        }
        assets
    }

    pub fn set(&self, id: &str, bytes: &[u8]) {
        self.images
            .borrow_mut()
            .insert(id.to_string(), bytes.to_vec());
    }

    pub fn remove(&self, id: &str) {
        self.images.borrow_mut().remove(id);
    }
}

impl AssetSource for MemAssets {
    fn read_asset(&self, asset_id: &str) -> std::io::Result<Vec<u8>> {
        self.images
            .borrow()
            .get(asset_id)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, asset_id.to_string()))
    }
}

/// State kept in memory; counts saves.
#[derive(Default)]
pub struct MemState {
    pub state: RefCell<StickerState>,
    pub saves: Cell<usize>,
    /// Every save fails like a full disk.
    pub fail_saves: Cell<bool>,
}

impl StateStore for MemState {
    fn load(&self) -> Result<StickerState, StateError> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &StickerState) -> Result<(), StateError> {
        if self.fail_saves.get() {
            return Err(StateError::Io {
                path: "stickerset_state_main.json".into(),
                source: std::io::Error::other("no space left on device"),
            });
        }
        *self.state.borrow_mut() = state.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

impl MemState {
    /// Remote ids recorded in the state.
    pub fn ids(&self) -> HashSet<String> {
        self.state
            .borrow()
            .iter()
            .map(|(_, entry)| entry.tg_id.clone())
            .collect()
    }
}

pub fn defs(pairs: &[(&str, &str)]) -> Vec<Definition> {
    pairs
        .iter()
        .map(|(asset_id, emoji)| Definition {
            asset_id: asset_id.to_string(),
            emoji: emoji.to_string(),
        })
        .collect()
}
