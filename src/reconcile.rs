//! Makes a remote sticker set mirror a pack's definitions.
//!
//! Stickers are identified by the hash of their image bytes, so renaming an
//! asset or changing its emoji does not cause a re-upload, while any change to
//! the image does. The state store maps hashes to remote ids and is saved after
//! every remote mutation.

use crate::assets::{AssetSource, content_hash};
use crate::definitions::Definition;
use crate::remote::{ApiError, RemoteSticker, StickerApi, StickerSet};
use crate::state::{StateError, StateStore, StickerState};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const RESOLVE_ATTEMPTS: u32 = 3;

/// A definition together with the hash of its current image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub hash: String,
    pub asset_id: String,
    pub emoji: String,
}

/// The remote set a pack is synchronized into.
#[derive(Debug, Clone)]
pub struct SetTarget {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCandidate {
    pub asset_id: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// The set did not exist and was created by this run.
    pub created: bool,
    pub retained: usize,
    pub added: usize,
    pub removed: usize,
    /// Unknown stickers deleted from the set.
    pub swept: usize,
    pub failed: Vec<FailedCandidate>,
}

impl ReconcileReport {
    /// Number of remote create/add/delete calls that succeeded.
    pub fn mutations(&self) -> usize {
        usize::from(self.created) + self.added + self.removed + self.swept
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("cannot resolve sticker set {name}")]
    SetResolution {
        name: String,
        #[source]
        source: ApiError,
    },
    #[error("cannot create sticker set {name} from {asset_id}")]
    SetCreation {
        name: String,
        asset_id: String,
        #[source]
        source: CandidateError,
    },
    #[error("cannot list stickers of {name}")]
    Listing {
        name: String,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    State(#[from] StateError),
}

/// Why a single sticker could not be uploaded.
#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    #[error("cannot read asset")]
    Asset(#[from] std::io::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("the new sticker did not show up in the set")]
    Unidentified,
}

pub struct SetReconciler<'a> {
    api: &'a dyn StickerApi,
    assets: &'a dyn AssetSource,
    owner_id: i64,
    retry_delay: Duration,
}

impl<'a> SetReconciler<'a> {
    pub fn new(api: &'a dyn StickerApi, assets: &'a dyn AssetSource, owner_id: i64) -> Self {
        Self {
            api,
            assets,
            owner_id,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// Base delay between attempts to resolve the set; grows linearly.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn reconcile(
        &self,
        target: &SetTarget,
        store: &dyn StateStore,
        definitions: &[Definition],
    ) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::default();
        let mut candidates = self.hash_candidates(definitions, &mut report);
        let unreadable = report.failed.len();
        let mut state = store.load()?;
        // Stable ids of every sticker that is supposed to stay in the set.
        let mut known: HashSet<String> = HashSet::new();

        info!("Resolving set {}", target.name);
        match self.resolve_set(&target.name)? {
            Some(set) => debug!("resolved {} with {} stickers", set.name, set.stickers.len()),
            None if candidates.is_empty() => {
                warn!("{} does not exist and there is nothing to put in it", target.name);
                return Ok(report);
            }
            None => {
                info!("Unable to resolve, creating sticker set {}", target.name);
                let seed = candidates.remove(0);
                let tg_id = self.create_set(target, &seed).map_err(|source| {
                    ReconcileError::SetCreation {
                        name: target.name.clone(),
                        asset_id: seed.asset_id.clone(),
                        source,
                    }
                })?;
                // A new set holds nothing that older state could refer to.
                state = StickerState::default();
                state.insert(seed.hash, tg_id.clone());
                store.save(&state)?;
                known.insert(tg_id);
                report.created = true;
                info!("Created set with sticker {}", seed.asset_id);
            }
        }

        // Retain: content that is already uploaded stays as it is.
        let wanted: HashSet<String> = candidates.iter().map(|c| c.hash.clone()).collect();
        candidates.retain(|candidate| match state.get(&candidate.hash) {
            Some(entry) => {
                known.insert(entry.tg_id.clone());
                report.retained += 1;
                false
            }
            None => true,
        });

        // Prune: collect first, then mutate.
        let stale: Vec<(String, String)> = state
            .iter()
            .filter(|(hash, entry)| !wanted.contains(*hash) && !known.contains(&entry.tg_id))
            .map(|(hash, entry)| (hash.clone(), entry.tg_id.clone()))
            .collect();
        if unreadable > 0 && !stale.is_empty() {
            // A hash that could not be computed looks exactly like a removed
            // definition, so stale stickers stay until every asset reads again.
            warn!(
                "{unreadable} asset(s) could not be read, keeping {} stale sticker(s) for now",
                stale.len()
            );
            known.extend(stale.into_iter().map(|(_, tg_id)| tg_id));
        } else if !stale.is_empty() {
            let remote = self.list(&target.name)?;
            for (hash, tg_id) in stale {
                match remote.iter().find(|sticker| sticker.file_unique_id == tg_id) {
                    Some(sticker) => match self.api.delete_sticker_from_set(&sticker.file_id) {
                        Ok(()) => {
                            info!("Removed sticker {tg_id}, its image is no longer defined");
                            report.removed += 1;
                        }
                        Err(error) => {
                            error!("cannot remove sticker {tg_id}: {error}");
                            known.insert(tg_id.clone());
                            report.failed.push(FailedCandidate {
                                asset_id: tg_id,
                                reason: error.to_string(),
                            });
                            continue;
                        }
                    },
                    None => debug!("sticker {tg_id} is already gone from the set"),
                }
                state.remove(&hash);
                store.save(&state)?;
            }
        }

        // Add: everything whose content is new.
        for candidate in candidates {
            match self.add_sticker(&target.name, &candidate) {
                Ok(tg_id) => {
                    info!("Uploaded sticker {}", candidate.asset_id);
                    state.insert(candidate.hash, tg_id.clone());
                    store.save(&state)?;
                    known.insert(tg_id);
                    report.added += 1;
                }
                Err(error) => {
                    error!("Failed to upload {}: {error}", candidate.asset_id);
                    report.failed.push(FailedCandidate {
                        asset_id: candidate.asset_id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        // Sweep: whatever the set holds beyond the known stickers.
        for sticker in self.list(&target.name)? {
            if known.contains(&sticker.file_unique_id) {
                continue;
            }
            match self.api.delete_sticker_from_set(&sticker.file_id) {
                Ok(()) => {
                    info!("Deleted unknown sticker {}", sticker.file_unique_id);
                    report.swept += 1;
                }
                Err(error) => {
                    error!("cannot delete unknown sticker {}: {error}", sticker.file_unique_id);
                    report.failed.push(FailedCandidate {
                        asset_id: sticker.file_unique_id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Hashes every definition. Identical images collapse into one candidate,
    /// the last definition wins.
    fn hash_candidates(
        &self,
        definitions: &[Definition],
        report: &mut ReconcileReport,
    ) -> Vec<Candidate> {
        info!("Hashing files");
        let mut candidates: Vec<Candidate> = vec![];
        let mut positions: HashMap<String, usize> = HashMap::new();
        for definition in definitions {
            let bytes = match self.assets.read_asset(&definition.asset_id) {
                Ok(bytes) => bytes,
                Err(error) => {
                    error!("cannot read asset {}: {error}", definition.asset_id);
                    report.failed.push(FailedCandidate {
                        asset_id: definition.asset_id.clone(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };
            let candidate = Candidate {
                hash: content_hash(&bytes),
                asset_id: definition.asset_id.clone(),
                emoji: definition.emoji.clone(),
            };
            match positions.get(&candidate.hash).copied() {
                Some(index) => {
                    debug!(
                        "{} has the same image as {}",
                        candidate.asset_id, candidates[index].asset_id
                    );
                    candidates[index] = candidate;
                }
                None => {
                    positions.insert(candidate.hash.clone(), candidates.len());
                    candidates.push(candidate);
                }
            }
        }
        candidates
    }

    fn resolve_set(&self, name: &str) -> Result<Option<StickerSet>, ReconcileError> {
        let mut attempt = 1;
        loop {
            match self.api.get_sticker_set(name) {
                Ok(set) => return Ok(set),
                Err(error) if error.is_transient() && attempt < RESOLVE_ATTEMPTS => {
                    warn!("resolving {name} failed (attempt {attempt}): {error}");
                    std::thread::sleep(self.retry_delay * attempt);
                    attempt += 1;
                }
                Err(source) => {
                    return Err(ReconcileError::SetResolution {
                        name: name.to_string(),
                        source,
                    });
                }
            }
        }
    }

    fn list(&self, name: &str) -> Result<Vec<RemoteSticker>, ReconcileError> {
        self.api
            .list_stickers(name)
            .map_err(|source| ReconcileError::Listing {
                name: name.to_string(),
                source,
            })
    }

    /// Creates the set seeded with `seed` and returns the seed's stable id.
    fn create_set(&self, target: &SetTarget, seed: &Candidate) -> Result<String, CandidateError> {
        let png = self.assets.read_asset(&seed.asset_id)?;
        let file_id = self.api.upload_sticker_file(self.owner_id, png)?;
        self.api.create_new_sticker_set(
            self.owner_id,
            &target.name,
            &target.title,
            &file_id,
            &seed.emoji,
        )?;
        let stickers = self.api.list_stickers(&target.name)?;
        match stickers.as_slice() {
            [sticker] => Ok(sticker.file_unique_id.clone()),
            _ => Err(CandidateError::Unidentified),
        }
    }

    /// Uploads and adds one sticker. The add call does not report the new
    /// sticker, so it is found by comparing the set before and after.
    fn add_sticker(&self, set_name: &str, candidate: &Candidate) -> Result<String, CandidateError> {
        let png = self.assets.read_asset(&candidate.asset_id)?;
        let file_id = self.api.upload_sticker_file(self.owner_id, png)?;
        let before: HashSet<String> = self
            .api
            .list_stickers(set_name)?
            .into_iter()
            .map(|sticker| sticker.file_unique_id)
            .collect();
        self.api
            .add_sticker_to_set(self.owner_id, set_name, &file_id, &candidate.emoji)?;
        self.api
            .list_stickers(set_name)?
            .into_iter()
            .map(|sticker| sticker.file_unique_id)
            .find(|id| !before.contains(id))
            .ok_or(CandidateError::Unidentified)
    }
}
