//! The sticker operations of the messaging platform that the reconciler needs.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteSticker {
    /// Identifier used to address the sticker in API calls. May change between calls.
    pub file_id: String,
    /// Stable identifier of the sticker.
    pub file_unique_id: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StickerSet {
    pub name: String,
    pub title: String,
    pub stickers: Vec<RemoteSticker>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("HTTP request failed")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for ApiError {
    /// The request URL carries the bot token, it must never end up in logs.
    fn from(error: reqwest::Error) -> Self {
        ApiError::Transport(error.without_url())
    }
}

impl ApiError {
    /// Whether repeating the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Api { code, .. } => *code == 429 || *code >= 500,
            ApiError::Transport(_) => true,
            ApiError::Unexpected(_) => false,
        }
    }
}

/// Remote sticker set operations. `owner` is the user the sets belong to.
pub trait StickerApi {
    /// Username of the bot, part of every set name it owns.
    fn bot_username(&self) -> Result<String, ApiError>;

    /// `Ok(None)` only if the platform confirmed that the set does not exist.
    fn get_sticker_set(&self, name: &str) -> Result<Option<StickerSet>, ApiError>;

    /// Uploads a static PNG sticker and returns its `file_id`.
    fn upload_sticker_file(&self, owner: i64, png: Vec<u8>) -> Result<String, ApiError>;

    fn create_new_sticker_set(
        &self,
        owner: i64,
        name: &str,
        title: &str,
        file_id: &str,
        emoji: &str,
    ) -> Result<(), ApiError>;

    fn add_sticker_to_set(
        &self,
        owner: i64,
        name: &str,
        file_id: &str,
        emoji: &str,
    ) -> Result<(), ApiError>;

    fn delete_sticker_from_set(&self, file_id: &str) -> Result<(), ApiError>;

    /// Current stickers of an existing set, in set order.
    fn list_stickers(&self, name: &str) -> Result<Vec<RemoteSticker>, ApiError> {
        match self.get_sticker_set(name)? {
            Some(set) => Ok(set.stickers),
            None => Err(ApiError::Unexpected(format!("sticker set {name} does not exist"))),
        }
    }
}
