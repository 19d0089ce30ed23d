//! Instagram resolution: a flat provider chain that short-circuits on the
//! first non-empty result, with a login-wall placeholder check guarding the
//! generic acquisition fallback.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::{ResolveError, Result};
use super::types::{ProviderOutcome, ResolutionResult, Strategy};
use crate::providers::VideoProvider;

/// External collaborators of the Instagram chain.
#[async_trait]
pub trait InstagramGateway: Send + Sync {
    /// Plain file download of a resolved video URL.
    async fn download_file(&self, url: &str, path: &Path) -> Result<()>;

    /// Generic media-platform acquisition of the post URL itself.
    async fn ytdlp_download(&self, url: &str, dir: &Path) -> Result<PathBuf>;

    /// Probed duration in seconds, `None` when unknown.
    async fn probe_duration(&self, path: &Path) -> Option<f64>;

    /// The direct page-embedded-JSON scrape, forced when a generic download
    /// turns out to be a placeholder.
    async fn page_scrape(&self, url: &str) -> Result<Vec<String>>;
}

fn strategy_for(provider_name: &str) -> Strategy {
    match provider_name {
        "rapidapi-reels" => Strategy::RapidApiReels,
        "rapidapi" => Strategy::RapidApi,
        "apify-instagram" => Strategy::ApifyInstagram,
        _ => Strategy::PageJson,
    }
}

async fn accept_video(
    gateway: &dyn InstagramGateway,
    video_url: &str,
    strategy: Strategy,
    workdir: &Path,
) -> Result<ResolutionResult> {
    let path = workdir.join("video.mp4");
    gateway.download_file(video_url, &path).await?;
    let mut result = ResolutionResult {
        video: Some(path),
        ..Default::default()
    };
    result.mark(strategy);
    Ok(result)
}

/// Resolves an Instagram post to a downloaded video file. The provider list
/// is the single source of priority: specialized short-form first (gated by
/// `accepts`), then the general and secondary providers, then the direct
/// page scrape. First non-empty result wins outright.
pub async fn resolve_video(
    gateway: &dyn InstagramGateway,
    providers: &[Box<dyn VideoProvider>],
    url: &str,
    workdir: &Path,
) -> Result<ResolutionResult> {
    for provider in providers {
        if !provider.accepts(url) {
            continue;
        }
        let outcome = match provider.fetch_video_urls(url).await {
            Ok(urls) if urls.is_empty() => ProviderOutcome::Empty,
            Ok(urls) => ProviderOutcome::Success(urls),
            Err(err) => ProviderOutcome::Error(err.to_string()),
        };
        match outcome {
            ProviderOutcome::Success(urls) => {
                info!(url, provider = provider.name(), "provider resolved video");
                match accept_video(
                    gateway,
                    &urls[0],
                    strategy_for(provider.name()),
                    workdir,
                )
                .await
                {
                    Ok(result) => return Ok(result),
                    Err(err) => {
                        warn!(provider = provider.name(), error = %err, "video download failed");
                    }
                }
            }
            ProviderOutcome::Empty => {
                info!(url, provider = provider.name(), "provider returned no urls");
            }
            ProviderOutcome::Error(reason) => {
                warn!(url, provider = provider.name(), reason, "provider failed, advancing");
            }
        }
    }

    // Generic acquisition as the last resort, guarded against the
    // login-wall placeholder clip.
    match gateway.ytdlp_download(url, workdir).await {
        Ok(path) => {
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let duration = gateway.probe_duration(&path).await;
            if crate::media::is_login_placeholder(duration, size) {
                warn!(url, ?duration, size, "placeholder clip discarded, forcing page scrape");
                let _ = std::fs::remove_file(&path);
                let urls = gateway.page_scrape(url).await.unwrap_or_default();
                if let Some(video_url) = urls.first() {
                    return accept_video(gateway, video_url, Strategy::PageJson, workdir).await;
                }
                return Err(ResolveError::NoMediaFound);
            }
            let mut result = ResolutionResult {
                video: Some(path),
                ..Default::default()
            };
            result.mark(Strategy::YtDlp);
            Ok(result)
        }
        Err(err) => {
            warn!(url, error = %err, "generic acquisition failed");
            Err(ResolveError::NoMediaFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedProvider {
        name: &'static str,
        reels_only: bool,
        urls: Result<Vec<String>>,
        calls: &'static Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl VideoProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn accepts(&self, url: &str) -> bool {
            !self.reels_only || url.contains("/reel/")
        }

        async fn fetch_video_urls(&self, _url: &str) -> Result<Vec<String>> {
            self.calls.lock().unwrap().push(self.name);
            match &self.urls {
                Ok(urls) => Ok(urls.clone()),
                Err(_) => Err(ResolveError::Fetch("scripted".into())),
            }
        }
    }

    #[derive(Default)]
    struct ScriptedGateway {
        ytdlp_file: Option<(&'static str, Vec<u8>)>,
        duration: Option<f64>,
        scrape_urls: Vec<String>,
    }

    #[async_trait]
    impl InstagramGateway for ScriptedGateway {
        async fn download_file(&self, _url: &str, path: &Path) -> Result<()> {
            std::fs::write(path, b"video").unwrap();
            Ok(())
        }

        async fn ytdlp_download(&self, _url: &str, dir: &Path) -> Result<PathBuf> {
            match &self.ytdlp_file {
                Some((name, data)) => {
                    let path = dir.join(name);
                    std::fs::write(&path, data).unwrap();
                    Ok(path)
                }
                None => Err(ResolveError::DownloadFailed("scripted".into())),
            }
        }

        async fn probe_duration(&self, _path: &Path) -> Option<f64> {
            self.duration
        }

        async fn page_scrape(&self, _url: &str) -> Result<Vec<String>> {
            Ok(self.scrape_urls.clone())
        }
    }

    fn leaked_calls() -> &'static Mutex<Vec<&'static str>> {
        Box::leak(Box::new(Mutex::new(Vec::new())))
    }

    #[tokio::test]
    async fn test_short_circuits_on_first_non_empty_provider() {
        let calls = leaked_calls();
        let providers: Vec<Box<dyn VideoProvider>> = vec![
            Box::new(ScriptedProvider {
                name: "rapidapi-reels",
                reels_only: true,
                urls: Ok(vec![]),
                calls,
            }),
            Box::new(ScriptedProvider {
                name: "rapidapi",
                reels_only: false,
                urls: Ok(vec!["https://cdn/v.mp4".to_string()]),
                calls,
            }),
            Box::new(ScriptedProvider {
                name: "apify-instagram",
                reels_only: false,
                urls: Ok(vec!["https://cdn/never.mp4".to_string()]),
                calls,
            }),
        ];
        let gateway = ScriptedGateway::default();
        let dir = tempfile::tempdir().unwrap();

        let result = resolve_video(
            &gateway,
            &providers,
            "https://www.instagram.com/p/AbC/",
            dir.path(),
        )
        .await
        .unwrap();

        assert!(result.video.is_some());
        assert_eq!(result.trail, vec![Strategy::RapidApi]);
        // Reels provider never accepted a /p/ link; the secondary provider
        // was never reached.
        assert_eq!(*calls.lock().unwrap(), vec!["rapidapi"]);
    }

    #[tokio::test]
    async fn test_reels_provider_tried_first_for_reel_links() {
        let calls = leaked_calls();
        let providers: Vec<Box<dyn VideoProvider>> = vec![
            Box::new(ScriptedProvider {
                name: "rapidapi-reels",
                reels_only: true,
                urls: Ok(vec!["https://cdn/reel.mp4".to_string()]),
                calls,
            }),
            Box::new(ScriptedProvider {
                name: "rapidapi",
                reels_only: false,
                urls: Ok(vec!["https://cdn/other.mp4".to_string()]),
                calls,
            }),
        ];
        let gateway = ScriptedGateway::default();
        let dir = tempfile::tempdir().unwrap();

        let result = resolve_video(
            &gateway,
            &providers,
            "https://www.instagram.com/reel/AbC/",
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(result.trail, vec![Strategy::RapidApiReels]);
        assert_eq!(*calls.lock().unwrap(), vec!["rapidapi-reels"]);
    }

    #[tokio::test]
    async fn test_provider_error_advances_to_next() {
        let calls = leaked_calls();
        let providers: Vec<Box<dyn VideoProvider>> = vec![
            Box::new(ScriptedProvider {
                name: "rapidapi",
                reels_only: false,
                urls: Err(ResolveError::Fetch("down".into())),
                calls,
            }),
            Box::new(ScriptedProvider {
                name: "apify-instagram",
                reels_only: false,
                urls: Ok(vec!["https://cdn/v.mp4".to_string()]),
                calls,
            }),
        ];
        let gateway = ScriptedGateway::default();
        let dir = tempfile::tempdir().unwrap();

        let result = resolve_video(
            &gateway,
            &providers,
            "https://www.instagram.com/p/AbC/",
            dir.path(),
        )
        .await
        .unwrap();
        assert_eq!(result.trail, vec![Strategy::ApifyInstagram]);
    }

    #[tokio::test]
    async fn test_placeholder_clip_discarded_and_scrape_forced() {
        let gateway = ScriptedGateway {
            ytdlp_file: Some(("source.mp4", vec![0u8; 50_000])),
            duration: Some(1.2),
            scrape_urls: vec!["https://cdn/real.mp4".to_string()],
        };
        let dir = tempfile::tempdir().unwrap();

        let result = resolve_video(&gateway, &[], "https://www.instagram.com/p/X/", dir.path())
            .await
            .unwrap();

        assert_eq!(result.trail, vec![Strategy::PageJson]);
        // The placeholder itself must not survive.
        assert!(!dir.path().join("source.mp4").exists());
        assert!(dir.path().join("video.mp4").exists());
    }

    #[tokio::test]
    async fn test_healthy_download_accepted_unchanged() {
        let gateway = ScriptedGateway {
            ytdlp_file: Some(("source.mp4", vec![0u8; 2_000_000])),
            duration: Some(10.0),
            scrape_urls: vec![],
        };
        let dir = tempfile::tempdir().unwrap();

        let result = resolve_video(&gateway, &[], "https://www.instagram.com/p/X/", dir.path())
            .await
            .unwrap();

        assert_eq!(result.trail, vec![Strategy::YtDlp]);
        assert_eq!(result.video, Some(dir.path().join("source.mp4")));
    }

    #[tokio::test]
    async fn test_placeholder_with_empty_scrape_is_no_media_found() {
        let gateway = ScriptedGateway {
            ytdlp_file: Some(("source.mp4", vec![0u8; 10])),
            duration: Some(0.5),
            scrape_urls: vec![],
        };
        let dir = tempfile::tempdir().unwrap();

        let err = resolve_video(&gateway, &[], "https://www.instagram.com/p/X/", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoMediaFound));
    }
}
