use crate::assets::PngDir;
use crate::config::SyncConfig;
use crate::packs::{AssetTree, Pack};
use crate::reconcile::{ReconcileReport, SetReconciler, SetTarget};
use crate::remote::StickerApi;
use crate::state::{StateFile, StateStore, StickerState};
use anyhow::{Context, Error};

pub enum PackSyncError {
    /// The operator refused to start tracking a set whose unknown stickers would be purged.
    Declined,
    /// Loading definitions, talking to the platform or persisting state failed.
    SyncFailed(anyhow::Error),
}

impl From<anyhow::Error> for PackSyncError {
    fn from(error: Error) -> Self {
        Self::SyncFailed(error)
    }
}

pub struct StickerSync<'a> {
    config: &'a SyncConfig,
    api: &'a dyn StickerApi,
    tree: AssetTree,
    bot_username: String,
}

impl<'a> StickerSync<'a> {
    pub fn new(
        config: &'a SyncConfig,
        api: &'a dyn StickerApi,
        tree: AssetTree,
    ) -> anyhow::Result<Self> {
        let bot_username = api.bot_username().context("cannot look up the bot user")?;
        Ok(Self {
            config,
            api,
            tree,
            bot_username,
        })
    }

    pub fn tree(&self) -> &AssetTree {
        &self.tree
    }

    /// Brings the remote set of `pack` in line with its definitions.
    ///
    /// `confirm` is asked before a pack without a state file is touched, since
    /// every sticker already in its set will be deleted.
    pub fn sync_pack(
        &self,
        pack: &Pack,
        confirm: &dyn Fn(&Pack) -> bool,
    ) -> Result<ReconcileReport, PackSyncError> {
        let definitions = pack.load_definitions()?;

        let store = StateFile::for_pack(&self.config.work_dir, &pack.name);
        if !store.exists() {
            tracing::warn!(
                "No state file found for {}, its set will be purged after a successful sync",
                pack.name
            );
            if !confirm(pack) {
                return Err(PackSyncError::Declined);
            }
            store
                .save(&StickerState::default())
                .context("cannot create state file")?;
        }

        let target = SetTarget {
            name: pack.set_name(&self.config.set_name, &self.bot_username),
            title: pack.title.clone(),
        };
        let assets = PngDir::new(self.tree.png_dir());
        let report = SetReconciler::new(self.api, &assets, self.config.owner_id)
            .reconcile(&target, &store, &definitions)
            .with_context(|| format!("cannot sync pack {}", pack.name))?;
        Ok(report)
    }
}
