//! TikTok photo-post resolution: the deepest fallback chain. Strategies run
//! strictly sequentially, each one filling only the slots still empty, and a
//! slot filled by an earlier strategy is never overwritten by a later one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::classify::extract_item_id;
use super::embedded::extract_embedded_json;
use super::error::{ResolveError, Result};
use super::extract::{audio_url_from_item, cdn_photo_scan, photo_urls_from_item};
use super::locate::{find_first_image_post, find_item};
use super::types::{AudioAsset, CandidateUrl, MediaKind, ResolutionResult, Strategy};
use crate::config::Config;
use crate::net::tiktok::{audio_candidate_urls, oembed_thumbnail};
use crate::providers::TikTokProviderMedia;

/// External collaborators of the photo-post chain. The production
/// implementation wires these to the HTTP fetcher, the platform endpoints,
/// the provider client and yt-dlp; tests substitute scripted outcomes.
#[async_trait]
pub trait TikTokGateway: Send + Sync {
    /// Best-effort canonicalization; implementations return the input URL
    /// on failure.
    async fn resolve_redirect(&self, url: &str) -> String;

    /// Item-detail API lookup; `None` uniformly means no data.
    async fn fetch_item_detail(&self, item_id: &str) -> Option<Value>;

    async fn fetch_page_html(&self, url: &str) -> Result<String>;

    async fn fetch_oembed(&self, url: &str) -> Option<Value>;

    /// Provider-backed photo/audio lookup (configured separately).
    async fn fetch_provider_media(&self, url: &str) -> Result<TikTokProviderMedia>;

    /// Dedicated audio-only acquisition: an actual download, not URL
    /// discovery. `None` when the pull produced nothing.
    async fn download_audio(&self, url: &str, dir: &Path) -> Option<PathBuf>;

    /// Generic acquisition metadata probe for the last-resort step.
    async fn ytdlp_info(&self, url: &str) -> Option<Value>;
}

fn push_photos(result: &mut ResolutionResult, urls: Vec<String>, strategy: Strategy) {
    let mut added = false;
    for url in urls {
        if result.photos.iter().any(|c| c.url == url) {
            continue;
        }
        result.photos.push(CandidateUrl {
            url,
            kind: MediaKind::Photo,
            strategy,
        });
        added = true;
    }
    if added {
        result.mark(strategy);
    }
}

fn set_audio_url(result: &mut ResolutionResult, url: String, strategy: Strategy) {
    if result.audio.is_some() {
        return;
    }
    result.audio = Some(AudioAsset::Url(CandidateUrl {
        url,
        kind: MediaKind::Audio,
        strategy,
    }));
    result.mark(strategy);
}

/// Last-resort generic acquisition: thumbnails as photos plus an audio-only
/// pull, both against the given URL.
async fn generic_fallback(
    gateway: &dyn TikTokGateway,
    url: &str,
    strategy: Strategy,
    workdir: &Path,
    result: &mut ResolutionResult,
) {
    if let Some(info) = gateway.ytdlp_info(url).await {
        let photos = crate::media::ytdlp::photo_urls_from_info(&info);
        push_photos(result, photos, strategy);
    }
    if result.audio.is_none() {
        if let Some(path) = gateway.download_audio(url, workdir).await {
            result.audio = Some(AudioAsset::File(path));
            result.mark(strategy);
        }
    }
}

/// Resolves a TikTok photo post into photo candidates and an audio asset.
pub async fn resolve_photo_post(
    gateway: &dyn TikTokGateway,
    config: &Config,
    source_url: &str,
    workdir: &Path,
) -> Result<ResolutionResult> {
    let mut result = ResolutionResult::default();

    // Step 1: canonicalize. The short-link hosts redirect to the real post.
    let url = gateway.resolve_redirect(source_url).await;
    let item_id = extract_item_id(&url).or_else(|| extract_item_id(source_url));

    // Provider-backed fill, only when credentials are configured.
    if config.has_apify_tiktok() {
        match gateway.fetch_provider_media(&url).await {
            Ok(media) => {
                push_photos(&mut result, media.photo_urls, Strategy::ApifyTikTok);
                if let Some(audio_url) = media.audio_url {
                    set_audio_url(&mut result, audio_url, Strategy::ApifyTikTok);
                }
            }
            Err(err) => warn!(url, error = %err, "provider media fetch failed"),
        }
    }

    // Steps 2-3: obtain an item record, by API lookup first, page scrape
    // second. The scrape is skipped entirely when the lookup succeeds.
    let mut item: Option<Value> = None;
    let mut item_strategy = Strategy::ItemDetail;
    let mut page_data: Option<Value> = None;
    if result.photos.is_empty() || result.audio.is_none() {
        if let Some(id) = &item_id {
            item = gateway.fetch_item_detail(id).await;
        }
        if item.is_none() {
            item_strategy = Strategy::PageEmbed;
            match gateway.fetch_page_html(&url).await {
                Ok(html) => {
                    page_data = extract_embedded_json(&html);
                    if let Some(data) = &page_data {
                        item = item_id
                            .as_deref()
                            .and_then(|id| find_item(data, id))
                            .or_else(|| find_first_image_post(data))
                            .cloned();
                    }
                }
                Err(err) => warn!(url, error = %err, "page fetch failed"),
            }
        }
    }

    // Step 4: targeted extractors over whichever item record we got.
    if let Some(item) = &item {
        if result.photos.is_empty() {
            push_photos(&mut result, photo_urls_from_item(item), item_strategy);
        }
        if result.audio.is_none() {
            if let Some(audio_url) = audio_url_from_item(item) {
                set_audio_url(&mut result, audio_url, item_strategy);
            }
        }
    }

    // Step 5: metadata-embed thumbnail as exactly one photo candidate.
    let mut oembed: Option<Value> = None;
    if result.photos.is_empty() {
        oembed = gateway.fetch_oembed(&url).await;
        if let Some(thumb) = oembed.as_ref().and_then(oembed_thumbnail) {
            push_photos(&mut result, vec![thumb], Strategy::Oembed);
        }
    }

    // Step 6: untargeted CDN scan over the raw page data, appended after
    // the targeted candidates. Gated by the configurable threshold.
    if result.photos.len() < config.cdn_scan_min_photos {
        if let Some(data) = &page_data {
            push_photos(&mut result, cdn_photo_scan(data), Strategy::CdnScan);
        }
    }

    // Step 7: dedicated audio-only acquisition from the canonical post URL
    // (and its path variants) resolved through the metadata-embed.
    if result.audio.is_none() {
        if oembed.is_none() {
            oembed = gateway.fetch_oembed(&url).await;
        }
        for candidate in audio_candidate_urls(&url, oembed.as_ref()) {
            if let Some(path) = gateway.download_audio(&candidate, workdir).await {
                result.audio = Some(AudioAsset::File(path));
                result.mark(Strategy::OembedAudio);
                break;
            }
        }
    }

    // Step 8: nothing at all yet — generic acquisition on the post URL,
    // then once more with the photo segment swapped for the video one.
    if result.is_empty() {
        generic_fallback(gateway, &url, Strategy::YtDlp, workdir, &mut result).await;
        if result.is_empty() && url.contains("/photo/") {
            let alt = url.replace("/photo/", "/video/");
            generic_fallback(gateway, &alt, Strategy::YtDlpAltPath, workdir, &mut result).await;
        }
    }

    info!(
        url,
        item_id = item_id.as_deref().unwrap_or(""),
        item_record = item.is_some(),
        photos = result.photos.len(),
        audio = result.audio.is_some(),
        trail = %result
            .trail
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
        "photo post resolution finished"
    );

    // Step 9: full exhaustion is the only fatal outcome.
    if result.is_empty() {
        return Err(ResolveError::NoMediaFound);
    }
    Ok(result)
}
