//! Last.fm client for `track.getInfo`.

use super::{TrackMetadata, TrackMetadataProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
/// Index of the extra-large image in Last.fm's size-ordered image list.
const EXTRALARGE_IMAGE_INDEX: usize = 3;

pub struct LastFmClient {
    client: Client,
    api_key: String,
}

#[derive(Deserialize)]
struct TrackInfoResponse {
    track: Option<LastFmTrack>,
}

#[derive(Deserialize)]
struct LastFmTrack {
    album: Option<LastFmAlbum>,
}

#[derive(Deserialize)]
struct LastFmAlbum {
    title: Option<String>,
    #[serde(default)]
    image: Vec<LastFmImage>,
}

#[derive(Deserialize)]
struct LastFmImage {
    #[serde(rename = "#text")]
    url: Option<String>,
    size: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn metadata_from_response(response: TrackInfoResponse) -> TrackMetadata {
    let Some(album) = response.track.and_then(|t| t.album) else {
        return TrackMetadata::default();
    };
    let cover_index = album
        .image
        .iter()
        .position(|img| img.size.as_deref() == Some("extralarge"))
        .unwrap_or(EXTRALARGE_IMAGE_INDEX);
    let cover = album
        .image
        .into_iter()
        .nth(cover_index)
        .and_then(|img| non_empty(img.url));
    TrackMetadata {
        album: non_empty(album.title),
        cover,
    }
}

impl LastFmClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl TrackMetadataProvider for LastFmClient {
    async fn lookup(&self, name: &str, artist: &str) -> Result<TrackMetadata> {
        let url = format!(
            "{}?method=track.getInfo&api_key={}&artist={}&track={}&format=json",
            LASTFM_API_BASE,
            self.api_key,
            urlencoding::encode(artist),
            urlencoding::encode(name)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Last.fm request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Last.fm API failed with status {}", response.status());
        }

        // Unknown tracks come back as an error object without `track`.
        let body: TrackInfoResponse = response.json().await?;
        let metadata = metadata_from_response(body);
        debug!("Last.fm metadata for {} - {}: {:?}", artist, name, metadata);
        Ok(metadata)
    }
}
