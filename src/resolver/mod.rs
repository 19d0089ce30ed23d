pub mod classify;
pub mod embedded;
pub mod error;
pub mod extract;
pub mod instagram;
pub mod locate;
pub mod tiktok;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::net::{self, Fetcher, TIMEOUT_PAGE};
use crate::providers::{
    ApifyInstagramProvider, ApifyTikTokClient, PageJsonProvider, RapidApiProvider,
    RapidApiReelsProvider, TikTokProviderMedia, VideoProvider,
};
use error::ResolveError;
use instagram::InstagramGateway;
use tiktok::TikTokGateway;
use types::{AudioAsset, Platform, ResolutionResult, Strategy};

/// The resolution engine: classifies a link and walks the platform's
/// strategy chain until a result is filled or every strategy is exhausted.
/// Strategies run strictly sequentially; distinct requests share no state.
pub struct Resolver {
    config: Config,
    fetcher: Fetcher,
}

impl Resolver {
    pub fn new(config: Config) -> Result<Self> {
        let cookie_file = if config.use_cookies {
            net::find_cookie_file(&config.cookie_paths)
        } else {
            None
        };
        let fetcher =
            Fetcher::new(cookie_file.as_deref()).context("failed to initialize fetcher")?;
        Ok(Self { config, fetcher })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Resolves one post URL into media assets inside `workdir`. Temporary
    /// artifacts are confined to `workdir`; the caller owns its lifetime.
    pub async fn resolve(
        &self,
        url: &str,
        workdir: &Path,
    ) -> std::result::Result<ResolutionResult, ResolveError> {
        let request = classify::classify(url);
        info!(
            url,
            platform = ?request.platform,
            photo_post = request.is_photo_post,
            item_id = request.item_id.as_deref().unwrap_or(""),
            "resolving link"
        );

        match request.platform {
            Platform::TikTok if request.is_photo_post => {
                let gateway = HttpTikTokGateway {
                    fetcher: self.fetcher.clone(),
                    provider: ApifyTikTokClient::new(
                        self.config.apify_token.clone(),
                        self.config.apify_tiktok_actor.clone(),
                    ),
                };
                tiktok::resolve_photo_post(&gateway, &self.config, url, workdir).await
            }
            Platform::Instagram => {
                let gateway = HttpInstagramGateway {
                    fetcher: self.fetcher.clone(),
                };
                let providers = self.instagram_providers();
                instagram::resolve_video(&gateway, &providers, url, workdir).await
            }
            _ => self.resolve_generic(&request, workdir).await,
        }
    }

    /// One explicit priority list for the video-only platform: specialized
    /// short-form provider, general provider, secondary provider, direct
    /// page scrape.
    fn instagram_providers(&self) -> Vec<Box<dyn VideoProvider>> {
        let mut providers: Vec<Box<dyn VideoProvider>> = Vec::new();
        if self.config.has_rapidapi() {
            providers.push(Box::new(RapidApiReelsProvider::new(
                self.config.rapidapi_key.clone(),
                self.config.rapidapi_reels_host.clone(),
            )));
            providers.push(Box::new(RapidApiProvider::new(
                self.config.rapidapi_key.clone(),
                self.config.rapidapi_host.clone(),
            )));
        }
        if self.config.instagram_use_apify_fallback && !self.config.apify_token.is_empty() {
            providers.push(Box::new(ApifyInstagramProvider::new(
                self.config.apify_token.clone(),
                self.config.apify_instagram_actor.clone(),
            )));
        }
        providers.push(Box::new(PageJsonProvider::new(self.fetcher.clone())));
        providers
    }

    /// Plain video acquisition for generic links and TikTok video posts.
    /// TikTok videos additionally get their audio track extracted.
    async fn resolve_generic(
        &self,
        request: &types::MediaRequest,
        workdir: &Path,
    ) -> std::result::Result<ResolutionResult, ResolveError> {
        let url = if request.platform == Platform::TikTok {
            self.fetcher.resolve_redirect(&request.source_url).await
        } else {
            request.source_url.clone()
        };

        let video = crate::media::ytdlp::download_video(&url, workdir)
            .await
            .map_err(|e| ResolveError::DownloadFailed(e.to_string()))?;

        let mut result = ResolutionResult {
            video: Some(video.clone()),
            ..Default::default()
        };
        result.mark(Strategy::YtDlp);

        if request.platform == Platform::TikTok {
            let audio_path = workdir.join("audio.m4a");
            match crate::media::ffmpeg::extract_audio(&video, &audio_path).await {
                Ok(()) => result.audio = Some(AudioAsset::File(audio_path)),
                Err(err) => warn!(url, error = %err, "audio track extraction failed"),
            }
        }
        Ok(result)
    }
}

/// Production TikTok collaborators: platform endpoints over the shared
/// fetcher, the configured provider client, and yt-dlp for audio pulls.
struct HttpTikTokGateway {
    fetcher: Fetcher,
    provider: ApifyTikTokClient,
}

#[async_trait]
impl TikTokGateway for HttpTikTokGateway {
    async fn resolve_redirect(&self, url: &str) -> String {
        self.fetcher.resolve_redirect(url).await
    }

    async fn fetch_item_detail(&self, item_id: &str) -> Option<Value> {
        net::tiktok::fetch_item_detail(&self.fetcher, item_id).await
    }

    async fn fetch_page_html(&self, url: &str) -> std::result::Result<String, ResolveError> {
        self.fetcher
            .get_text(url, &[("Referer", url.to_string())], TIMEOUT_PAGE)
            .await
    }

    async fn fetch_oembed(&self, url: &str) -> Option<Value> {
        net::tiktok::fetch_oembed(&self.fetcher, url).await
    }

    async fn fetch_provider_media(
        &self,
        url: &str,
    ) -> std::result::Result<TikTokProviderMedia, ResolveError> {
        self.provider.fetch_media(url).await
    }

    async fn download_audio(&self, url: &str, dir: &Path) -> Option<PathBuf> {
        match crate::media::ytdlp::download_audio(url, dir).await {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(url, error = %err, "audio-only acquisition failed");
                None
            }
        }
    }

    async fn ytdlp_info(&self, url: &str) -> Option<Value> {
        crate::media::ytdlp::extract_info(url).await.ok()
    }
}

/// Production Instagram collaborators.
struct HttpInstagramGateway {
    fetcher: Fetcher,
}

#[async_trait]
impl InstagramGateway for HttpInstagramGateway {
    async fn download_file(&self, url: &str, path: &Path) -> std::result::Result<(), ResolveError> {
        self.fetcher.download(url, path).await
    }

    async fn ytdlp_download(
        &self,
        url: &str,
        dir: &Path,
    ) -> std::result::Result<PathBuf, ResolveError> {
        crate::media::ytdlp::download_video(url, dir)
            .await
            .map_err(|e| ResolveError::DownloadFailed(e.to_string()))
    }

    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        crate::media::ffmpeg::probe_duration(path).await
    }

    async fn page_scrape(&self, url: &str) -> std::result::Result<Vec<String>, ResolveError> {
        PageJsonProvider::new(self.fetcher.clone())
            .fetch_video_urls(url)
            .await
    }
}
