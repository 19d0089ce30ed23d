pub mod tiktok;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::resolver::error::ResolveError;

/// Browser-like identity presented to platform pages and CDNs.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

/// Short calls: redirect resolution, oembed.
pub const TIMEOUT_SHORT: Duration = Duration::from_secs(15);
/// Page and API fetches.
pub const TIMEOUT_PAGE: Duration = Duration::from_secs(20);
/// Asset downloads.
pub const TIMEOUT_DOWNLOAD: Duration = Duration::from_secs(30);
/// Heavy third-party provider calls.
pub const TIMEOUT_PROVIDER: Duration = Duration::from_secs(120);

/// Page fetcher with a fixed browser header set and an optional cookie jar.
/// Non-2xx, timeout and transport errors all map uniformly to `Fetch`.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(cookie_file: Option<&Path>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(path) = cookie_file {
            let jar = load_cookie_jar(path)
                .with_context(|| format!("failed to load cookies from {}", path.display()))?;
            builder = builder.cookie_provider(Arc::new(jar));
        }

        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub async fn get_text(
        &self,
        url: &str,
        headers: &[(&str, String)],
        timeout: Duration,
    ) -> Result<String, ResolveError> {
        let mut req = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }

    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, ResolveError> {
        let mut req = self.client.get(url).query(params).timeout(timeout);
        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Best-effort redirect resolution to the canonical post URL. On any
    /// failure the original URL is kept.
    pub async fn resolve_redirect(&self, url: &str) -> String {
        match self.client.get(url).timeout(TIMEOUT_SHORT).send().await {
            Ok(resp) => resp.url().to_string(),
            Err(err) => {
                debug!(url, error = %err, "redirect resolution failed, keeping original");
                url.to_string()
            }
        }
    }

    /// Downloads one asset to disk. Write failures are `DownloadFailed`,
    /// transport failures are `Fetch`.
    pub async fn download(&self, url: &str, path: &Path) -> Result<(), ResolveError> {
        let resp = self
            .client
            .get(url)
            .timeout(TIMEOUT_DOWNLOAD)
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| ResolveError::DownloadFailed(e.to_string()))?;
        debug!(url, bytes = bytes.len(), path = %path.display(), "asset downloaded");
        Ok(())
    }
}

/// Parses a Netscape-format cookie file into a reqwest jar. Lines are seven
/// tab-separated fields; comments and short lines are skipped.
fn load_cookie_jar(path: &Path) -> Result<Jar> {
    let text = std::fs::read_to_string(path)?;
    let jar = Jar::default();
    let mut count = 0usize;
    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        let (domain, cookie_path, name, value) = (fields[0], fields[2], fields[5], fields[6]);
        let host = domain.trim_start_matches('.');
        let url = match format!("https://{host}/").parse::<url::Url>() {
            Ok(url) => url,
            Err(err) => {
                warn!(domain, error = %err, "skipping cookie with unparseable domain");
                continue;
            }
        };
        jar.add_cookie_str(
            &format!("{name}={value}; Domain={domain}; Path={cookie_path}"),
            &url,
        );
        count += 1;
    }
    if count > 0 {
        info!(count, path = %path.display(), "loaded cookies");
    }
    Ok(jar)
}

/// First existing cookie file among the configured candidates.
pub fn find_cookie_file(paths: &[String]) -> Option<std::path::PathBuf> {
    paths
        .iter()
        .map(std::path::PathBuf::from)
        .find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_cookie_jar_skips_comments_and_short_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# Netscape HTTP Cookie File").unwrap();
        writeln!(file, "short\tline").unwrap();
        writeln!(
            file,
            ".tiktok.com\tTRUE\t/\tTRUE\t0\tsessionid\tabc123"
        )
        .unwrap();
        let jar = load_cookie_jar(file.path());
        assert!(jar.is_ok());
    }

    #[test]
    fn test_find_cookie_file_prefers_first_existing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let existing = file.path().to_string_lossy().to_string();
        let found = find_cookie_file(&["/nonexistent/cookies.txt".to_string(), existing.clone()]);
        assert_eq!(found, Some(std::path::PathBuf::from(existing)));
        assert_eq!(find_cookie_file(&[]), None);
    }
}
