//! Apify actor clients: a TikTok photo/audio-capable actor and an Instagram
//! video actor. Both use the synchronous run-and-fetch-dataset endpoint with
//! the long provider timeout.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::VideoProvider;
use crate::net::TIMEOUT_PROVIDER;
use crate::resolver::error::{ResolveError, Result};
use crate::resolver::extract::{audio_url_anywhere, video_urls_from_response};

const APIFY_BASE_URL: &str = "https://api.apify.com/v2";

const PHOTO_KEYS: [&str; 5] = [
    "photo_downloads",
    "photoDownloads",
    "photos",
    "photo_urls",
    "photoUrls",
];

const AUDIO_KEYS: [&str; 9] = [
    "Download audio",
    "download_audio",
    "audio_download",
    "audio",
    "audio_url",
    "audioUrl",
    "music_url",
    "musicUrl",
    "music",
];

const NESTED_URL_KEYS: [&str; 5] = ["url", "downloadUrl", "download_url", "file", "fileUrl"];

/// Photo and audio URLs pulled from one TikTok provider dataset item.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TikTokProviderMedia {
    pub photo_urls: Vec<String>,
    pub audio_url: Option<String>,
}

/// Flattens a provider value (string, list of strings/objects, or object)
/// into URLs, following the nested url-ish keys for objects.
fn normalize_url_list(value: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    match value {
        Value::String(s) => urls.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => urls.push(s.clone()),
                    Value::Object(obj) => {
                        for key in NESTED_URL_KEYS {
                            if let Some(Value::String(s)) = obj.get(key) {
                                urls.push(s.clone());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::Object(obj) => {
            for key in NESTED_URL_KEYS {
                if let Some(Value::String(s)) = obj.get(key) {
                    urls.push(s.clone());
                }
            }
        }
        _ => {}
    }
    urls
}

/// Extracts photo and audio URLs from the first dataset item. Pure; the
/// response shape is unstable so every known key spelling is consulted.
pub fn provider_media_from_item(item: &Value) -> TikTokProviderMedia {
    let photo_urls = PHOTO_KEYS
        .iter()
        .filter_map(|key| item.get(*key))
        .filter(|v| !v.is_null())
        .map(normalize_url_list)
        .find(|urls| !urls.is_empty())
        .unwrap_or_default();

    let mut audio_url = AUDIO_KEYS.iter().filter_map(|key| item.get(*key)).find_map(
        |value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(_) | Value::Object(_) => normalize_url_list(value).into_iter().next(),
            _ => None,
        },
    );

    // Last resort: deep scan for anything that looks like an audio URL.
    if audio_url.is_none() {
        audio_url = audio_url_anywhere(item);
    }

    TikTokProviderMedia {
        photo_urls,
        audio_url,
    }
}

/// Client for the TikTok slideshow/audio actor.
pub struct ApifyTikTokClient {
    client: reqwest::Client,
    token: String,
    actor_id: String,
}

impl ApifyTikTokClient {
    pub fn new(token: String, actor_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            actor_id,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.actor_id.is_empty()
    }

    pub async fn fetch_media(&self, url: &str) -> Result<TikTokProviderMedia> {
        if !self.is_configured() {
            return Err(ResolveError::ProviderMisconfigured("apify token not set"));
        }
        let endpoint = format!(
            "{APIFY_BASE_URL}/acts/{}/run-sync-get-dataset-items",
            self.actor_id
        );
        let payload = json!({
            "desired_resolution": "576p",
            "include_watermark": false,
            "saveToKeyValueStore": true,
            "video_urls": [{"url": url, "method": "GET"}],
        });
        let items: Value = self
            .client
            .post(&endpoint)
            .query(&[("token", self.token.as_str())])
            .json(&payload)
            .timeout(TIMEOUT_PROVIDER)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let first = items
            .as_array()
            .and_then(|a| a.first())
            .ok_or(ResolveError::NoCandidates)?;
        let media = provider_media_from_item(first);
        debug!(
            url,
            photos = media.photo_urls.len(),
            audio = media.audio_url.is_some(),
            "provider dataset item parsed"
        );
        Ok(media)
    }
}

/// Instagram video actor, exposed through the common provider trait.
pub struct ApifyInstagramProvider {
    client: reqwest::Client,
    token: String,
    actor_id: String,
}

impl ApifyInstagramProvider {
    pub fn new(token: String, actor_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            actor_id,
        }
    }
}

#[async_trait]
impl VideoProvider for ApifyInstagramProvider {
    fn name(&self) -> &'static str {
        "apify-instagram"
    }

    async fn fetch_video_urls(&self, url: &str) -> Result<Vec<String>> {
        if self.token.is_empty() || self.actor_id.is_empty() {
            return Err(ResolveError::ProviderMisconfigured("apify token not set"));
        }
        let endpoint = format!(
            "{APIFY_BASE_URL}/acts/{}/run-sync-get-dataset-items",
            self.actor_id
        );
        let payload = json!({
            "startUrls": [{"url": url}],
            "resolution": "1080p",
        });
        let items: Value = self
            .client
            .post(&endpoint)
            .query(&[("token", self.token.as_str())])
            .json(&payload)
            .timeout(TIMEOUT_PROVIDER)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !items.as_array().is_some_and(|a| !a.is_empty()) {
            return Ok(Vec::new());
        }
        Ok(video_urls_from_response(&items))
    }
}
