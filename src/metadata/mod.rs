//! Track metadata enrichment for uploads.

mod format;
mod lastfm;

pub use format::capitalize_words;
pub use lastfm::LastFmClient;

use anyhow::Result;
use async_trait::async_trait;

/// What a lookup can add to an uploaded track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub album: Option<String>,
    /// Large cover image URL.
    pub cover: Option<String>,
}

#[async_trait]
pub trait TrackMetadataProvider: Send + Sync {
    /// `name` and `artist` are already formatted. A track the provider does
    /// not know is Ok with no metadata.
    async fn lookup(&self, name: &str, artist: &str) -> Result<TrackMetadata>;
}

/// Used when no metadata service is configured.
#[derive(Debug, Clone, Default)]
pub struct NoOpMetadataProvider;

#[async_trait]
impl TrackMetadataProvider for NoOpMetadataProvider {
    async fn lookup(&self, _name: &str, _artist: &str) -> Result<TrackMetadata> {
        Ok(TrackMetadata::default())
    }
}
