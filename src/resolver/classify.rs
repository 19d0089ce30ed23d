use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::types::{MediaRequest, Platform};

static URL_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(https?://\S+)").unwrap());
static ITEM_ID_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:photo|video)/(\d+)").unwrap());
static ITEM_ID_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]item_id=(\d+)").unwrap());
static IG_SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(p|reel|tv)/([A-Za-z0-9_-]+)/?").unwrap());
static IG_MEDIA_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(p|reel|tv|stories)/").unwrap());
static IG_MEDIA_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(p|reel|tv|stories)/[^/]+/?").unwrap());

/// Pulls the first URL out of free text, trimming surrounding punctuation.
pub fn extract_url(text: &str) -> Option<String> {
    let m = URL_TOKEN.find(text)?;
    let trimmed = m
        .as_str()
        .trim()
        .trim_matches(|c| "()[]<>.,!\"'".contains(c));
    Some(trimmed.to_string())
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

fn path_of(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.path().to_ascii_lowercase())
}

pub fn is_tiktok_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    if lower.contains("tiktok.com") {
        return true;
    }
    host_of(url).is_some_and(|h| h.contains("tiktok.com"))
}

/// Photo posts carry a reserved `/photo/` path segment. Checked against both
/// the raw lowercase string and the parsed path, since inputs come from chat
/// text and are not always well formed.
pub fn is_tiktok_photo(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    if lower.contains("tiktok.com") && lower.contains("/photo/") {
        return true;
    }
    match (host_of(url), path_of(url)) {
        (Some(host), Some(path)) => host.contains("tiktok.com") && path.contains("/photo/"),
        _ => false,
    }
}

pub fn is_instagram_url(url: &str) -> bool {
    host_of(url).is_some_and(|h| h.contains("instagram.com") || h.contains("instagr.am"))
}

/// Numeric item id from the path segment pattern, falling back to the
/// `item_id` query parameter. Path segment wins when both are present.
pub fn extract_item_id(url: &str) -> Option<String> {
    if let Some(caps) = ITEM_ID_PATH.captures(url) {
        return Some(caps[1].to_string());
    }
    ITEM_ID_QUERY.captures(url).map(|caps| caps[1].to_string())
}

/// Classifies a raw URL into an immutable request. Never fails: anything
/// that matches no known platform becomes `Generic`.
pub fn classify(url: &str) -> MediaRequest {
    let platform = if is_tiktok_url(url) {
        Platform::TikTok
    } else if is_instagram_url(url) {
        Platform::Instagram
    } else {
        Platform::Generic
    };
    MediaRequest {
        source_url: url.to_string(),
        platform,
        is_photo_post: platform == Platform::TikTok && is_tiktok_photo(url),
        item_id: extract_item_id(url),
    }
}

pub fn instagram_shortcode(url: &str) -> Option<String> {
    IG_SHORTCODE.captures(url).map(|caps| caps[2].to_string())
}

pub fn instagram_media_type(url: &str) -> Option<String> {
    IG_MEDIA_TYPE.captures(url).map(|caps| caps[1].to_string())
}

pub fn instagram_username(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        return None;
    }
    let first = path.split('/').next()?;
    if matches!(first, "p" | "reel" | "tv" | "stories") {
        return None;
    }
    Some(first.to_string())
}

pub fn instagram_profile_url(username: &str) -> String {
    format!("https://www.instagram.com/{username}/")
}

/// Canonical `www.instagram.com` host with a trailing slash on media paths.
pub fn normalize_instagram_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let scheme = parsed.scheme();
    let mut host = parsed.host_str().unwrap_or("www.instagram.com").to_string();
    if host == "instagr.am" || host == "instagram.com" {
        host = "www.instagram.com".to_string();
    }
    let mut path = parsed.path().to_string();
    if IG_MEDIA_PATH.is_match(&path) && !path.ends_with('/') {
        path.push('/');
    }
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    format!("{scheme}://{host}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_url_from_text() {
        assert_eq!(
            extract_url("check this out https://www.tiktok.com/@u/photo/123!").as_deref(),
            Some("https://www.tiktok.com/@u/photo/123")
        );
        assert_eq!(extract_url("no links here"), None);
    }

    #[test]
    fn test_classify_platforms() {
        assert_eq!(
            classify("https://www.tiktok.com/@u/video/123").platform,
            Platform::TikTok
        );
        assert_eq!(
            classify("https://vt.tiktok.com/ZS123abc/").platform,
            Platform::TikTok
        );
        assert_eq!(
            classify("https://www.instagram.com/reel/ABC123/").platform,
            Platform::Instagram
        );
        assert_eq!(
            classify("https://example.com/video.mp4").platform,
            Platform::Generic
        );
    }

    #[test]
    fn test_classify_never_fails_on_garbage() {
        let req = classify("not even a url");
        assert_eq!(req.platform, Platform::Generic);
        assert!(!req.is_photo_post);
        assert!(req.item_id.is_none());
    }

    #[test]
    fn test_photo_post_detection() {
        assert!(classify("https://www.tiktok.com/@u/photo/7123").is_photo_post);
        assert!(classify("https://WWW.TIKTOK.COM/@u/PHOTO/7123").is_photo_post);
        assert!(!classify("https://www.tiktok.com/@u/video/7123").is_photo_post);
        assert!(!classify("https://example.com/photo/1").is_photo_post);
    }

    #[test]
    fn test_item_id_path_takes_priority_over_query() {
        assert_eq!(
            extract_item_id("https://www.tiktok.com/@u/photo/111?item_id=222").as_deref(),
            Some("111")
        );
        assert_eq!(
            extract_item_id("https://m.tiktok.com/v/?item_id=222").as_deref(),
            Some("222")
        );
        assert_eq!(extract_item_id("https://www.tiktok.com/@u"), None);
    }

    #[test]
    fn test_instagram_helpers() {
        let url = "https://instagr.am/reel/AbC-123";
        assert_eq!(instagram_shortcode(url).as_deref(), Some("AbC-123"));
        assert_eq!(instagram_media_type(url).as_deref(), Some("reel"));
        assert_eq!(
            normalize_instagram_url(url),
            "https://www.instagram.com/reel/AbC-123/"
        );
        assert_eq!(
            instagram_username("https://www.instagram.com/natgeo/").as_deref(),
            Some("natgeo")
        );
        assert_eq!(instagram_username("https://www.instagram.com/p/AbC/"), None);
    }
}
