//! Direct page-embedded-JSON scrape for Instagram posts: the last resort
//! after the hosted providers, and the forced path when a generic download
//! produced a login-wall placeholder.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::VideoProvider;
use crate::net::{Fetcher, TIMEOUT_PAGE};
use crate::resolver::classify::instagram_shortcode;
use crate::resolver::error::Result;

const IG_APP_ID: &str = "936619743392459";

/// Known path kinds, tried in fixed order until one page yields a video.
const PATH_KINDS: [&str; 3] = ["reel", "p", "tv"];

fn first_video_version(value: &Value) -> Option<String> {
    value
        .get("video_versions")?
        .as_array()?
        .iter()
        .find_map(|v| v.get("url").and_then(Value::as_str))
        .map(str::to_string)
}

/// Video URL from one page-JSON document. Both the graphql shape and the
/// newer items shape are consulted, carousels included.
pub fn video_url_from_page_json(data: &Value) -> Option<String> {
    if let Some(media) = data.pointer("/graphql/shortcode_media") {
        if let Some(url) = media.get("video_url").and_then(Value::as_str) {
            return Some(url.to_string());
        }
        if let Some(url) = first_video_version(media) {
            return Some(url);
        }
        if let Some(carousel) = media.get("carousel_media").and_then(Value::as_array) {
            for item in carousel {
                if let Some(url) = item.get("video_url").and_then(Value::as_str) {
                    return Some(url.to_string());
                }
                if let Some(url) = first_video_version(item) {
                    return Some(url);
                }
            }
        }
    }
    if let Some(items) = data.get("items").and_then(Value::as_array) {
        for item in items {
            if let Some(url) = first_video_version(item) {
                return Some(url);
            }
            if let Some(carousel) = item.get("carousel_media").and_then(Value::as_array) {
                if let Some(url) = carousel.iter().find_map(first_video_version) {
                    return Some(url);
                }
            }
        }
    }
    None
}

pub struct PageJsonProvider {
    fetcher: Fetcher,
}

impl PageJsonProvider {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl VideoProvider for PageJsonProvider {
    fn name(&self) -> &'static str {
        "page-json"
    }

    async fn fetch_video_urls(&self, url: &str) -> Result<Vec<String>> {
        let Some(shortcode) = instagram_shortcode(url) else {
            return Ok(Vec::new());
        };
        for kind in PATH_KINDS {
            let page_url = format!("https://www.instagram.com/{kind}/{shortcode}/");
            let data = match self
                .fetcher
                .get_json(
                    &page_url,
                    &[("__a", "1"), ("__d", "dis")],
                    &[
                        ("Accept", "application/json,text/plain,*/*".to_string()),
                        ("X-IG-App-ID", IG_APP_ID.to_string()),
                    ],
                    TIMEOUT_PAGE,
                )
                .await
            {
                Ok(data) => data,
                Err(err) => {
                    debug!(kind, shortcode, error = %err, "page json fetch failed");
                    continue;
                }
            };
            if let Some(video_url) = video_url_from_page_json(&data) {
                return Ok(vec![video_url]);
            }
        }
        Ok(Vec::new())
    }
}
