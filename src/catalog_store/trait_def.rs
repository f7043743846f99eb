//! CatalogStore trait definition.

use super::models::{NewPlaylist, NewTrack, Playlist, PlaylistChanges, Track};
use anyhow::Result;

/// A window over a list ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub take: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackScope {
    All,
    /// Only these ids; unknown ids are ignored.
    Ids(Vec<String>),
    InPlaylist(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    pub scope: TrackScope,
    /// Case-insensitive substring of the track name.
    pub search: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistScope {
    Public,
    CreatedBy(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistQuery {
    pub scope: PlaylistScope,
    pub search: Option<String>,
    pub page: Page,
}

pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Tracks
    // =========================================================================

    fn insert_track(&self, new_track: &NewTrack) -> Result<Track>;

    fn get_track(&self, id: &str) -> Result<Option<Track>>;

    /// Exact match on the stored (formatted) name and artist.
    fn find_track(&self, name: &str, artist: &str) -> Result<Option<Track>>;

    /// Also drops the track from every playlist. Returns false if there was
    /// no such track.
    fn delete_track(&self, id: &str) -> Result<bool>;

    fn list_tracks(&self, query: &TrackQuery) -> Result<Vec<Track>>;

    fn count_tracks(&self) -> Result<usize>;

    // =========================================================================
    // Playlists
    // =========================================================================

    fn insert_playlist(&self, new_playlist: &NewPlaylist) -> Result<Playlist>;

    fn get_playlist(&self, id: &str) -> Result<Option<Playlist>>;

    fn list_playlists(&self, query: &PlaylistQuery) -> Result<Vec<Playlist>>;

    fn count_playlists(&self) -> Result<usize>;

    /// Returns false if there was no such playlist.
    fn update_playlist(&self, id: &str, changes: &PlaylistChanges) -> Result<bool>;

    /// Returns false if the track was already in the playlist.
    fn add_playlist_track(&self, playlist_id: &str, track_id: &str) -> Result<bool>;

    /// Returns false if the track was not in the playlist.
    fn remove_playlist_track(&self, playlist_id: &str, track_id: &str) -> Result<bool>;

    fn delete_playlist(&self, id: &str) -> Result<bool>;
}
