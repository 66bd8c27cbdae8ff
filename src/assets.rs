use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Read access to sticker images by asset id.
pub trait AssetSource {
    fn read_asset(&self, asset_id: &str) -> std::io::Result<Vec<u8>>;
}

/// Images stored as `<dir>/<asset_id>.png`.
pub struct PngDir {
    dir: PathBuf,
}

impl PngDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AssetSource for PngDir {
    fn read_asset(&self, asset_id: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.dir.join(format!("{asset_id}.png")))
    }
}

/// SHA-256 of the raw bytes, base64 encoded. This is the identity of a sticker.
pub fn content_hash(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}
