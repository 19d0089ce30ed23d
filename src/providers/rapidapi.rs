//! RapidAPI-hosted Instagram resolution providers. The request shapes these
//! gateways expect are undocumented, so the general provider probes a
//! bounded, explicitly ordered space of parameter-name and parameter-value
//! combinations (GET, then POST-JSON, then POST-form) until one yields URLs
//! or the space is exhausted. Attempts run strictly sequentially.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::VideoProvider;
use crate::resolver::classify::{
    instagram_media_type, instagram_profile_url, instagram_username, normalize_instagram_url,
};
use crate::resolver::error::{ResolveError, Result};
use crate::resolver::extract::video_urls_from_response;

const PARAM_KEYS: [&str; 19] = [
    "url",
    "Url",
    "URL",
    "link",
    "Link",
    "instagram_url",
    "instagramUrl",
    "media_url",
    "mediaUrl",
    "reel_url",
    "reelUrl",
    "video_url",
    "videoUrl",
    "post_url",
    "postUrl",
    "media",
    "download",
    "Userinfo",
    "username",
];

type ParamSet = BTreeMap<String, String>;

/// Ordered probe space: every key with every value, then the same grid with
/// media-type variants appended. Finite and deterministic.
fn request_shapes(url: &str) -> Vec<ParamSet> {
    let clean = normalize_instagram_url(url);
    let mut values = vec![clean.clone(), url.to_string()];
    if let Some(username) = instagram_username(&clean) {
        values.push(instagram_profile_url(&username));
        values.push(username);
    }
    let media_type = instagram_media_type(&clean);

    let mut shapes = Vec::new();
    for key in PARAM_KEYS {
        for value in &values {
            shapes.push(ParamSet::from([(key.to_string(), value.clone())]));
        }
    }
    if let Some(mt) = media_type {
        for key in PARAM_KEYS {
            for value in &values {
                for type_key in ["type", "media_type", "mediaType"] {
                    shapes.push(ParamSet::from([
                        (key.to_string(), value.clone()),
                        (type_key.to_string(), mt.clone()),
                    ]));
                }
            }
        }
    }
    shapes
}

/// General Instagram downloader gateway.
pub struct RapidApiProvider {
    client: reqwest::Client,
    key: String,
    host: String,
}

impl RapidApiProvider {
    pub fn new(key: String, host: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            key,
            host,
        }
    }

    fn base_url(&self) -> String {
        format!("https://{}/", self.host)
    }

    fn check_key(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(ResolveError::ProviderMisconfigured("rapidapi key not set"));
        }
        Ok(())
    }

    async fn attempt(
        &self,
        method: ProbeMethod,
        params: &ParamSet,
    ) -> Result<Vec<String>> {
        let base = self.base_url();
        let req = match method {
            ProbeMethod::Get => self.client.get(&base).query(params),
            ProbeMethod::PostJson => self.client.post(&base).json(params),
            ProbeMethod::PostForm => self.client.post(&base).form(params),
        };
        let resp = req
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", &self.key)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            debug!(body = %body.chars().take(200).collect::<String>(), "provider rejected shape");
            return Err(ResolveError::Fetch("provider returned 400".to_string()));
        }
        let data: Value = resp.error_for_status()?.json().await?;
        Ok(video_urls_from_response(&data))
    }
}

#[derive(Debug, Clone, Copy)]
enum ProbeMethod {
    Get,
    PostJson,
    PostForm,
}

#[async_trait]
impl VideoProvider for RapidApiProvider {
    fn name(&self) -> &'static str {
        "rapidapi"
    }

    async fn fetch_video_urls(&self, url: &str) -> Result<Vec<String>> {
        self.check_key()?;
        let shapes = request_shapes(url);
        let mut last_error: Option<ResolveError> = None;

        for method in [ProbeMethod::Get, ProbeMethod::PostJson, ProbeMethod::PostForm] {
            for params in &shapes {
                match self.attempt(method, params).await {
                    Ok(urls) if !urls.is_empty() => return Ok(urls),
                    Ok(_) => {}
                    Err(err) => {
                        last_error = Some(err);
                    }
                }
            }
        }

        match last_error {
            Some(err) => {
                warn!(url, error = %err, "all request shapes failed");
                Err(err)
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Specialized short-form (reels) gateway with a single known request shape.
pub struct RapidApiReelsProvider {
    client: reqwest::Client,
    key: String,
    host: String,
}

impl RapidApiReelsProvider {
    pub fn new(key: String, host: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            key,
            host,
        }
    }
}

#[async_trait]
impl VideoProvider for RapidApiReelsProvider {
    fn name(&self) -> &'static str {
        "rapidapi-reels"
    }

    fn accepts(&self, url: &str) -> bool {
        instagram_media_type(url).as_deref() == Some("reel")
    }

    async fn fetch_video_urls(&self, url: &str) -> Result<Vec<String>> {
        if self.key.is_empty() {
            return Err(ResolveError::ProviderMisconfigured("rapidapi key not set"));
        }
        let endpoint = format!("https://{}/download", self.host);
        let resp = self
            .client
            .get(&endpoint)
            .query(&[("url", normalize_instagram_url(url))])
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", &self.key)
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()?;
        let data: Value = resp.json().await?;
        Ok(video_urls_from_response(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shapes_are_ordered_and_bounded() {
        let shapes = request_shapes("https://www.instagram.com/reel/AbC123/");
        // Normalized URL comes first for every key; reel links additionally
        // get the three type-variant grids.
        assert_eq!(shapes[0], ParamSet::from([("url".into(), "https://www.instagram.com/reel/AbC123/".into())]));
        assert!(shapes.len() > PARAM_KEYS.len());
        assert!(shapes.iter().any(|s| s.contains_key("media_type")));
        // Non-media URLs get no type variants.
        let plain = request_shapes("https://www.instagram.com/someuser/");
        assert!(plain.iter().all(|s| !s.contains_key("type")));
    }

    #[test]
    fn test_misconfigured_key_detected_before_any_call() {
        let provider = RapidApiProvider::new(String::new(), "host".into());
        assert!(matches!(
            provider.check_key(),
            Err(ResolveError::ProviderMisconfigured(_))
        ));
    }

    #[test]
    fn test_reels_provider_accepts_only_reels() {
        let provider = RapidApiReelsProvider::new("k".into(), "h".into());
        assert!(provider.accepts("https://www.instagram.com/reel/AbC/"));
        assert!(!provider.accepts("https://www.instagram.com/p/AbC/"));
    }
}
