//! Pure heuristic walkers over schema-less payloads. No I/O here: every
//! function takes a `serde_json::Value` and returns ordered candidate URLs.
//!
//! Payload shapes are undocumented and shift between platform revisions, so
//! nothing below assumes more structure than the JSON value model itself.

use serde_json::Value;

/// Image entry keys tried per image object, in source order.
const IMAGE_KEYS: [&str; 6] = [
    "displayImage",
    "imageURL",
    "imageUrl",
    "image_url",
    "urlList",
    "url_list",
];

/// Music keys in fixed priority order. The first key producing any candidate
/// wins; lower-priority keys are never consulted after that.
const MUSIC_KEYS: [&str; 6] = [
    "playUrl",
    "playUrlV2",
    "playUrlV3",
    "playUrlList",
    "play_url",
    "play_url_list",
];

pub fn is_image_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http")
        && (lower.ends_with(".jpg")
            || lower.ends_with(".jpeg")
            || lower.ends_with(".png")
            || lower.contains(".jpg?")
            || lower.contains(".jpeg?")
            || lower.contains(".png?"))
}

fn has_image_hint(lower: &str) -> bool {
    [".jpg", ".jpeg", ".png", ".webp"]
        .iter()
        .any(|ext| lower.contains(ext))
}

pub fn is_audio_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http")
        && (lower.contains(".mp3")
            || lower.contains(".m4a")
            || lower.contains("mime_type=audio")
            || (lower.contains("audio") && lower.contains("tiktokcdn"))
            || (lower.contains("music") && lower.contains("tiktokcdn")))
}

pub fn is_probable_video_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    if !lower.starts_with("http") {
        return false;
    }
    if [".mp4", ".mov", ".webm", ".mkv"]
        .iter()
        .any(|ext| lower.contains(ext))
    {
        return true;
    }
    (lower.contains("mime_type=video") || lower.contains("video")) && !has_image_hint(&lower)
}

fn last_string(list: &[Value]) -> Option<&str> {
    list.last().and_then(Value::as_str)
}

/// Selection rule for one image entry. Providers order resolutions ascending,
/// so a non-empty string list yields its last element; a bare string is
/// accepted only when it matches the image pattern.
fn image_urls_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Object(obj) => {
            for key in ["urlList", "url_list", "urls", "url"] {
                match obj.get(key) {
                    Some(Value::Array(list)) if !list.is_empty() => {
                        if let Some(url) = last_string(list) {
                            return vec![url.to_string()];
                        }
                    }
                    Some(Value::String(s)) if is_image_url(s) => return vec![s.clone()],
                    _ => {}
                }
            }
            Vec::new()
        }
        Value::String(s) if is_image_url(s) => vec![s.clone()],
        Value::Array(list) if !list.is_empty() && list.iter().all(Value::is_string) => {
            match last_string(list) {
                Some(url) if is_image_url(url) => vec![url.to_string()],
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// Same list/scalar selection rule but with a plain looks-like-a-URL
/// predicate; audio CDN links rarely carry a useful extension.
fn audio_urls_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Object(obj) => {
            for key in ["urlList", "url_list", "url"] {
                match obj.get(key) {
                    Some(Value::Array(list)) if !list.is_empty() => {
                        if let Some(url) = last_string(list) {
                            return vec![url.to_string()];
                        }
                    }
                    Some(Value::String(s)) if s.starts_with("http") => return vec![s.clone()],
                    _ => {}
                }
            }
            Vec::new()
        }
        Value::String(s) if s.starts_with("http") => vec![s.clone()],
        Value::Array(list) if list.iter().all(Value::is_string) => list
            .iter()
            .filter_map(Value::as_str)
            .find(|v| v.starts_with("http") || is_audio_url(v))
            .map(|v| vec![v.to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn images_of_item(item: &Value) -> &[Value] {
    for container in ["imagePost", "imagePostInfo"] {
        if let Some(Value::Array(images)) = item
            .get(container)
            .and_then(|post| post.get("images"))
        {
            return images;
        }
    }
    match item.get("images") {
        Some(Value::Array(images)) => images,
        _ => &[],
    }
}

/// One candidate per image entry, in source order, deduped.
pub fn photo_urls_from_item(item: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    for image in images_of_item(item) {
        if let Value::Object(obj) = image {
            for key in IMAGE_KEYS {
                if let Some(value) = obj.get(key) {
                    urls.extend(image_urls_from_value(value));
                }
            }
        } else {
            urls.extend(image_urls_from_value(image));
        }
    }
    dedup_preserving_order(urls)
}

/// Audio URL from an item record: music sub-object keys in priority order
/// first, then the same play-url keys on the item itself.
pub fn audio_url_from_item(item: &Value) -> Option<String> {
    if let Some(music @ Value::Object(_)) = item.get("music") {
        for key in MUSIC_KEYS {
            if let Some(value) = music.get(key) {
                if let Some(url) = audio_urls_from_value(value).into_iter().next() {
                    return Some(url);
                }
            }
        }
    }
    for key in ["playUrl", "playUrlV2", "playUrlV3"] {
        if let Some(value) = item.get(key) {
            if let Some(url) = audio_urls_from_value(value).into_iter().next() {
                return Some(url);
            }
        }
    }
    None
}

/// Untargeted audio scan over an arbitrary payload (provider responses with
/// unknown shape). First candidate in discovery order wins.
pub fn audio_url_anywhere(tree: &Value) -> Option<String> {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(obj) => {
                if let Some(music @ Value::Object(_)) = obj.get("music") {
                    for key in MUSIC_KEYS {
                        if let Some(v) = music.get(key) {
                            out.extend(audio_urls_from_value(v));
                        }
                    }
                }
                for (key, v) in obj {
                    let lower = key.to_ascii_lowercase();
                    if MUSIC_KEYS
                        .iter()
                        .any(|k| k.eq_ignore_ascii_case(&lower))
                    {
                        out.extend(audio_urls_from_value(v));
                    }
                    walk(v, out);
                }
            }
            Value::Array(items) => {
                for v in items {
                    walk(v, out);
                }
            }
            Value::String(s) if is_audio_url(s) => out.push(s.clone()),
            _ => {}
        }
    }
    let mut candidates = Vec::new();
    walk(tree, &mut candidates);
    candidates.into_iter().next()
}

fn is_download_key(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "video_url"
            | "videourl"
            | "download_url"
            | "downloadurl"
            | "media_url"
            | "mediaurl"
            | "url"
            | "download"
            | "file"
    )
}

/// Generic video extractor over an arbitrary provider response. Strings are
/// accepted on the video-pattern predicate; download-style key names
/// additionally admit extension-less values that lack any image hint.
/// Discovery order, deduped.
pub fn video_urls_from_response(tree: &Value) -> Vec<String> {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(obj) => {
                for (key, v) in obj {
                    match v {
                        Value::String(s) => {
                            let lower = s.to_ascii_lowercase();
                            if is_probable_video_url(s)
                                || (is_download_key(key)
                                    && lower.starts_with("http")
                                    && !has_image_hint(&lower))
                            {
                                out.push(s.clone());
                            }
                        }
                        Value::Object(_) | Value::Array(_) => walk(v, out),
                        _ => {}
                    }
                }
            }
            Value::Array(items) => {
                for v in items {
                    walk(v, out);
                }
            }
            Value::String(s) if is_probable_video_url(s) => out.push(s.clone()),
            _ => {}
        }
    }
    let mut urls = Vec::new();
    walk(tree, &mut urls);
    dedup_preserving_order(urls)
}

/// Untargeted photo scan used as a supplement when the targeted extractors
/// produced too few candidates: image-post containers, image-style keys, and
/// bare CDN-hinted image strings anywhere in the page data.
pub fn cdn_photo_scan(tree: &Value) -> Vec<String> {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(obj) => {
                if obj.contains_key("imagePost") {
                    out.extend(photo_urls_from_item(value));
                }
                for (key, v) in obj {
                    if IMAGE_KEYS.contains(&key.as_str()) {
                        out.extend(image_urls_from_value(v));
                    }
                    walk(v, out);
                }
            }
            Value::Array(items) => {
                for v in items {
                    walk(v, out);
                }
            }
            Value::String(s) if is_image_url(s) && s.contains("tiktokcdn") => out.push(s.clone()),
            _ => {}
        }
    }
    let mut urls = Vec::new();
    walk(tree, &mut urls);
    dedup_preserving_order(urls)
}

/// First-seen order dedup; merging `[A,B]` with `[B,C]` yields `[A,B,C]`.
pub fn dedup_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_photo_list_takes_last_element() {
        let item = json!({
            "imagePost": {"images": [
                {"urlList": ["a", "b", "https://cdn/x_540.jpg"]}
            ]}
        });
        assert_eq!(photo_urls_from_item(&item), vec!["https://cdn/x_540.jpg"]);
    }

    #[test]
    fn test_photo_bare_string_passes_through() {
        let item = json!({"images": ["https://cdn/x_540.jpg"]});
        assert_eq!(photo_urls_from_item(&item), vec!["https://cdn/x_540.jpg"]);
    }

    #[test]
    fn test_photo_one_candidate_per_entry_in_source_order() {
        let item = json!({
            "imagePostInfo": {"images": [
                {"displayImage": {"url_list": ["low", "https://cdn/1.jpeg"]}},
                {"imageUrl": "https://cdn/2.png?x=1"}
            ]}
        });
        assert_eq!(
            photo_urls_from_item(&item),
            vec!["https://cdn/1.jpeg", "https://cdn/2.png?x=1"]
        );
    }

    #[test]
    fn test_non_image_bare_string_rejected() {
        let item = json!({"images": ["https://cdn/page.html"]});
        assert!(photo_urls_from_item(&item).is_empty());
    }

    #[test]
    fn test_audio_primary_key_wins_over_versioned() {
        let item = json!({
            "music": {
                "playUrl": "https://cdn/primary.m4a",
                "playUrlV2": "https://cdn/versioned.m4a"
            }
        });
        assert_eq!(
            audio_url_from_item(&item).as_deref(),
            Some("https://cdn/primary.m4a")
        );
    }

    #[test]
    fn test_audio_falls_to_list_variant_when_primary_absent() {
        let item = json!({
            "music": {"playUrlList": {"url_list": ["https://a", "https://b"]}}
        });
        assert_eq!(audio_url_from_item(&item).as_deref(), Some("https://b"));
    }

    #[test]
    fn test_audio_item_level_keys_are_fallback() {
        let item = json!({"playUrlV2": "https://cdn/item-level"});
        assert_eq!(
            audio_url_from_item(&item).as_deref(),
            Some("https://cdn/item-level")
        );
    }

    #[test]
    fn test_audio_anywhere_finds_cdn_hit() {
        let tree = json!({"deep": [{"x": "https://v16.tiktokcdn.com/music/123"}]});
        assert_eq!(
            audio_url_anywhere(&tree).as_deref(),
            Some("https://v16.tiktokcdn.com/music/123")
        );
        assert_eq!(audio_url_anywhere(&json!({"a": 1})), None);
    }

    #[test]
    fn test_video_walker_accepts_extensions_and_hints() {
        let tree = json!({
            "a": "https://cdn/clip.mp4",
            "b": {"c": ["https://host/stream?mime_type=video&id=1"]},
            "d": "https://cdn/thumb.jpg"
        });
        let urls = video_urls_from_response(&tree);
        assert!(urls.contains(&"https://cdn/clip.mp4".to_string()));
        assert!(urls.contains(&"https://host/stream?mime_type=video&id=1".to_string()));
        assert!(!urls.iter().any(|u| u.contains("thumb.jpg")));
    }

    #[test]
    fn test_video_walker_download_key_disambiguates() {
        let tree = json!({
            "download_url": "https://provider/fetch?id=9",
            "page_url": "https://provider/about"
        });
        assert_eq!(
            video_urls_from_response(&tree),
            vec!["https://provider/fetch?id=9"]
        );
    }

    #[test]
    fn test_video_walker_dedups_in_discovery_order() {
        let tree = json!(["https://a.mp4", "https://b.mp4", "https://a.mp4"]);
        assert_eq!(
            video_urls_from_response(&tree),
            vec!["https://a.mp4", "https://b.mp4"]
        );
    }

    #[test]
    fn test_cdn_scan_collects_only_cdn_hinted_strays() {
        let tree = json!({
            "stray": "https://p16.tiktokcdn.com/img/1.jpeg",
            "other": "https://elsewhere.com/img/2.jpeg",
            "entry": {"urlList": ["low", "https://cdn/3.jpg"]}
        });
        let urls = cdn_photo_scan(&tree);
        assert!(urls.contains(&"https://p16.tiktokcdn.com/img/1.jpeg".to_string()));
        assert!(urls.contains(&"https://cdn/3.jpg".to_string()));
        assert!(!urls.iter().any(|u| u.contains("elsewhere")));
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let merged = dedup_preserving_order(vec![
            "A".to_string(),
            "B".to_string(),
            "B".to_string(),
            "C".to_string(),
        ]);
        assert_eq!(merged, vec!["A", "B", "C"]);
    }
}
