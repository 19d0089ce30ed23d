mod apify;
mod instagram_page;
mod rapidapi;

pub use apify::{ApifyInstagramProvider, ApifyTikTokClient, TikTokProviderMedia};
pub use instagram_page::{video_url_from_page_json, PageJsonProvider};
pub use rapidapi::{RapidApiProvider, RapidApiReelsProvider};

use async_trait::async_trait;

use crate::resolver::error::Result;

/// One third-party video resolution provider. Providers accept an unknown
/// request shape and return whatever URLs the generic extractors can pull
/// out of an equally unknown response shape.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Human-readable name of the provider, used in logs and the trail.
    fn name(&self) -> &'static str;

    /// Whether this provider applies to the URL at all. Specialized
    /// providers (e.g. short-form only) narrow this down.
    fn accepts(&self, _url: &str) -> bool {
        true
    }

    /// Resolve the post URL into zero or more downloadable video URLs.
    async fn fetch_video_urls(&self, url: &str) -> Result<Vec<String>>;
}
