use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Immutable resolver configuration, constructed once at startup and passed
/// explicitly into the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Apify API token; empty disables the Apify-backed strategies.
    pub apify_token: String,
    pub apify_tiktok_actor: String,
    pub apify_instagram_actor: String,
    /// RapidAPI key shared by the Instagram provider hosts.
    pub rapidapi_key: String,
    pub rapidapi_host: String,
    pub rapidapi_reels_host: String,
    /// Whether the Apify Instagram actor is tried after the RapidAPI ones.
    pub instagram_use_apify_fallback: bool,
    /// Cookie jar for platform pages; off by default.
    pub use_cookies: bool,
    pub cookie_paths: Vec<String>,
    /// Minimum photo candidates before the untargeted CDN scan is skipped.
    /// The threshold is a heuristic, hence configurable.
    pub cdn_scan_min_photos: usize,
    pub logging_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apify_token: String::new(),
            apify_tiktok_actor: String::new(),
            apify_instagram_actor: String::new(),
            rapidapi_key: String::new(),
            rapidapi_host:
                "instagram-downloader-download-instagram-videos-stories1.p.rapidapi.com"
                    .to_string(),
            rapidapi_reels_host: "instagram-reels-downloader-api.p.rapidapi.com".to_string(),
            instagram_use_apify_fallback: true,
            use_cookies: false,
            cookie_paths: vec!["tiktok_cookies.txt".to_string(), "cookies.txt".to_string()],
            cdn_scan_min_photos: 2,
            logging_format: "plain".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config file {path}"))
    }

    pub fn has_apify_tiktok(&self) -> bool {
        !self.apify_token.is_empty() && !self.apify_tiktok_actor.is_empty()
    }

    pub fn has_rapidapi(&self) -> bool {
        !self.rapidapi_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cdn_scan_min_photos, 2);
        assert!(!config.use_cookies);
        assert!(!config.has_apify_tiktok());
        assert!(!config.has_rapidapi());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rapidapi_key = \"abc\"").unwrap();
        writeln!(file, "cdn_scan_min_photos = 3").unwrap();
        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(config.has_rapidapi());
        assert_eq!(config.cdn_scan_min_photos, 3);
        assert!(config.instagram_use_apify_fallback);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::from_file("/nonexistent/config.toml").is_err());
    }
}
