//! TikTok platform endpoints: the item-detail API and the oembed
//! metadata-embed endpoint. Both treat every failure as "no data".

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::{Fetcher, TIMEOUT_PAGE, TIMEOUT_SHORT};
use crate::resolver::extract::dedup_preserving_order;

const ITEM_DETAIL_URL: &str = "https://www.tiktok.com/api/item/detail/";
const OEMBED_URL: &str = "https://www.tiktok.com/oembed";

static CITE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"cite="(https?://[^"]+)""#).unwrap());
static HREF_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(https?://[^"]+)""#).unwrap());
static VIDEO_ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-video-id="(\d+)""#).unwrap());

/// Item-detail lookup by item id. Success means a nested `itemInfo.itemStruct`
/// object and a zero or absent status code; anything else is no data.
pub async fn fetch_item_detail(fetcher: &Fetcher, item_id: &str) -> Option<Value> {
    let referer = format!("https://www.tiktok.com/@tiktok/photo/{item_id}");
    let data = match fetcher
        .get_json(
            ITEM_DETAIL_URL,
            &[("itemId", item_id), ("aid", "1988")],
            &[("Referer", referer)],
            TIMEOUT_PAGE,
        )
        .await
    {
        Ok(data) => data,
        Err(err) => {
            debug!(item_id, error = %err, "item detail fetch failed");
            return None;
        }
    };

    let status = data
        .get("statusCode")
        .or_else(|| data.get("status_code"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if status != 0 {
        debug!(item_id, status, "item detail returned non-zero status");
    }

    match data.pointer("/itemInfo/itemStruct") {
        Some(item @ Value::Object(_)) => Some(item.clone()),
        _ => None,
    }
}

/// Lightweight metadata-embed lookup for a post URL.
pub async fn fetch_oembed(fetcher: &Fetcher, url: &str) -> Option<Value> {
    match fetcher
        .get_json(OEMBED_URL, &[("url", url)], &[], TIMEOUT_SHORT)
        .await
    {
        Ok(data @ Value::Object(_)) => Some(data),
        Ok(_) => None,
        Err(err) => {
            debug!(url, error = %err, "oembed fetch failed");
            None
        }
    }
}

pub fn oembed_thumbnail(oembed: &Value) -> Option<String> {
    oembed
        .get("thumbnail_url")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Reconstructs the canonical post URL from the oembed HTML fragment:
/// `cite=` link first, then `href=`, then a video-id attribute combined
/// with the author handle derived from `author_url`.
pub fn oembed_canonical_url(oembed: &Value) -> Option<String> {
    let html = oembed.get("html").and_then(Value::as_str)?;
    if let Some(caps) = CITE_LINK.captures(html) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = HREF_LINK.captures(html) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = VIDEO_ID_ATTR.captures(html) {
        let video_id = &caps[1];
        let author = oembed
            .get("author_url")
            .and_then(Value::as_str)
            .and_then(|u| u.trim_end_matches('/').rsplit('/').next())
            .filter(|a| !a.is_empty())
            .unwrap_or("tiktok");
        return Some(format!("https://www.tiktok.com/@{author}/video/{video_id}"));
    }
    None
}

/// Candidate URLs for a dedicated audio-only acquisition, in priority order:
/// the post URL itself, its video-path variant, then the oembed canonical
/// link and its variant. First-seen order, deduped.
pub fn audio_candidate_urls(url: &str, oembed: Option<&Value>) -> Vec<String> {
    let mut candidates = vec![url.to_string()];
    if url.contains("/photo/") {
        candidates.push(url.replace("/photo/", "/video/"));
    }
    if let Some(canonical) = oembed.and_then(oembed_canonical_url) {
        if canonical.contains("/photo/") {
            let swapped = canonical.replace("/photo/", "/video/");
            candidates.push(canonical);
            candidates.push(swapped);
        } else {
            candidates.push(canonical);
        }
    }
    dedup_preserving_order(candidates)
}
