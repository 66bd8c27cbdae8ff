//! [`StickerApi`] over the Telegram Bot API.

use crate::remote::{ApiError, StickerApi, StickerSet};
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Envelope of every Bot API response.
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Deserialize)]
struct User {
    username: Option<String>,
}

#[derive(Deserialize)]
struct File {
    file_id: String,
}

pub struct TelegramClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self, ApiError> {
        Self::with_base_url(token, API_BASE)
    }

    pub fn with_base_url(token: &str, api_base: &str) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{token}", api_base.trim_end_matches('/')),
        })
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ApiError> {
        tracing::debug!("calling {method}");
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(&params)
            .send()?
            .json()?;
        into_result(response)
    }
}

fn into_result<T>(response: ApiResponse<T>) -> Result<T, ApiError> {
    match response {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse { ok: true, .. } => {
            Err(ApiError::Unexpected("response without result".to_string()))
        }
        ApiResponse {
            error_code,
            description,
            ..
        } => Err(ApiError::Api {
            code: error_code.unwrap_or_default(),
            description: description.unwrap_or_default(),
        }),
    }
}

fn is_missing_set(error: &ApiError) -> bool {
    matches!(
        error,
        ApiError::Api { code: 400, description } if description.contains("STICKERSET_INVALID")
    )
}

/// One entry per emoji; flags and ZWJ sequences stay whole.
fn emoji_list(emoji: &str) -> Vec<&str> {
    emoji.graphemes(true).collect()
}

fn input_sticker(file_id: &str, emoji: &str) -> serde_json::Value {
    json!({
        "sticker": file_id,
        "format": "static",
        "emoji_list": emoji_list(emoji),
    })
}

impl StickerApi for TelegramClient {
    fn bot_username(&self) -> Result<String, ApiError> {
        let me: User = self.call("getMe", json!({}))?;
        me.username
            .ok_or_else(|| ApiError::Unexpected("bot has no username".to_string()))
    }

    fn get_sticker_set(&self, name: &str) -> Result<Option<StickerSet>, ApiError> {
        match self.call("getStickerSet", json!({ "name": name })) {
            Ok(set) => Ok(Some(set)),
            Err(error) if is_missing_set(&error) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn upload_sticker_file(&self, owner: i64, png: Vec<u8>) -> Result<String, ApiError> {
        tracing::debug!("calling uploadStickerFile ({} bytes)", png.len());
        let part = Part::bytes(png)
            .file_name("sticker.png")
            .mime_str("image/png")?;
        let form = Form::new()
            .text("user_id", owner.to_string())
            .text("sticker_format", "static")
            .part("sticker", part);
        let response: ApiResponse<File> = self
            .http
            .post(format!("{}/uploadStickerFile", self.base_url))
            .multipart(form)
            .send()?
            .json()?;
        Ok(into_result(response)?.file_id)
    }

    fn create_new_sticker_set(
        &self,
        owner: i64,
        name: &str,
        title: &str,
        file_id: &str,
        emoji: &str,
    ) -> Result<(), ApiError> {
        let _: bool = self.call(
            "createNewStickerSet",
            json!({
                "user_id": owner,
                "name": name,
                "title": title,
                "stickers": [input_sticker(file_id, emoji)],
            }),
        )?;
        Ok(())
    }

    fn add_sticker_to_set(
        &self,
        owner: i64,
        name: &str,
        file_id: &str,
        emoji: &str,
    ) -> Result<(), ApiError> {
        let _: bool = self.call(
            "addStickerToSet",
            json!({
                "user_id": owner,
                "name": name,
                "sticker": input_sticker(file_id, emoji),
            }),
        )?;
        Ok(())
    }

    fn delete_sticker_from_set(&self, file_id: &str) -> Result<(), ApiError> {
        let _: bool = self.call("deleteStickerFromSet", json!({ "sticker": file_id }))?;
        Ok(())
    }
}
