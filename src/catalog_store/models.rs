use crate::media::MediaDescriptor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Ids of tracks and playlists: a v4 uuid as 32 lowercase hex characters.
pub fn new_resource_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn is_valid_resource_id(id: &str) -> bool {
    id.len() == 32
        && id
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Name of the audio blob of a track.
pub fn track_blob_name(track_id: &str) -> String {
    format!("{}.mp3", track_id)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Cover art URL from the metadata lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Where the audio blob is served from.
    pub url: String,
    pub uploaded_by_user: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<String>,
    pub url: String,
    pub uploaded_by_user: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<MediaDescriptor>,
    pub created_by_user: usize,
    /// Track ids in insertion order.
    pub tracks: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub public: bool,
    pub cover: Option<MediaDescriptor>,
    pub created_by_user: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistChanges {
    pub name: Option<String>,
    pub cover: Option<MediaDescriptor>,
}

impl PlaylistChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.cover.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_ids() {
        let id = new_resource_id();
        assert!(is_valid_resource_id(&id));
        assert_ne!(id, new_resource_id());

        assert!(!is_valid_resource_id(""));
        assert!(!is_valid_resource_id("not-an-id"));
        assert!(!is_valid_resource_id(&id.to_uppercase()));
        assert!(!is_valid_resource_id(&format!("{}0", id)));
    }

    #[test]
    fn track_serializes_like_a_document() {
        let track = Track {
            id: "a".repeat(32),
            name: "Believer".to_string(),
            artist: "Imagine Dragons".to_string(),
            album: None,
            cover: Some("http://img/cover.png".to_string()),
            url: "http://localhost/v1/media/x.mp3".to_string(),
            uploaded_by_user: 7,
            created_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["_id"], "a".repeat(32));
        assert_eq!(json["uploadedByUser"], 7);
        assert_eq!(json["createdAt"], "2023-11-14T22:13:20Z");
        assert!(json.get("album").is_none());
    }
}
