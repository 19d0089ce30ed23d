use std::fmt;
use std::path::PathBuf;

/// Platform a link belongs to, decided by host matching only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    TikTok,
    Instagram,
    Generic,
}

/// Kind of a remote media candidate. Video never appears here: resolved
/// videos are materialized as files, not candidate URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Audio,
}

/// Named resolution strategies, recorded in the result trail for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ItemDetail,
    PageEmbed,
    Oembed,
    CdnScan,
    OembedAudio,
    YtDlp,
    YtDlpAltPath,
    ApifyTikTok,
    ApifyInstagram,
    RapidApi,
    RapidApiReels,
    PageJson,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::ItemDetail => "item-detail",
            Strategy::PageEmbed => "page-embed",
            Strategy::Oembed => "oembed",
            Strategy::CdnScan => "cdn-scan",
            Strategy::OembedAudio => "oembed-audio",
            Strategy::YtDlp => "yt-dlp",
            Strategy::YtDlpAltPath => "yt-dlp-alt-path",
            Strategy::ApifyTikTok => "apify-tiktok",
            Strategy::ApifyInstagram => "apify-instagram",
            Strategy::RapidApi => "rapidapi",
            Strategy::RapidApiReels => "rapidapi-reels",
            Strategy::PageJson => "page-json",
        };
        f.write_str(name)
    }
}

/// One incoming link, classified once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub source_url: String,
    pub platform: Platform,
    pub is_photo_post: bool,
    pub item_id: Option<String>,
}

/// A URL that passed the kind-specific pattern predicate at insertion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    pub url: String,
    pub kind: MediaKind,
    pub strategy: Strategy,
}

/// Audio is either a remote candidate URL or a file already pulled down
/// by an audio-only acquisition step.
#[derive(Debug, Clone)]
pub enum AudioAsset {
    Url(CandidateUrl),
    File(PathBuf),
}

/// Incrementally filled result. A slot is never overwritten once filled;
/// a successful result has at least one non-empty slot.
#[derive(Debug, Default)]
pub struct ResolutionResult {
    pub photos: Vec<CandidateUrl>,
    pub audio: Option<AudioAsset>,
    pub video: Option<PathBuf>,
    pub trail: Vec<Strategy>,
}

impl ResolutionResult {
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty() && self.audio.is_none() && self.video.is_none()
    }

    pub fn mark(&mut self, strategy: Strategy) {
        if !self.trail.contains(&strategy) {
            self.trail.push(strategy);
        }
    }
}

/// Outcome of one provider attempt. Used only for orchestration decisions
/// and logging, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Success(Vec<String>),
    Empty,
    Error(String),
}
