use crate::catalog_store::{
    is_owner, is_valid_resource_id, new_resource_id, CatalogStore, NewPlaylist, Playlist,
    PlaylistChanges, PlaylistQuery, PlaylistScope, Track, TrackQuery, TrackScope,
};
use crate::error::{ServiceError, ServiceResult};
use crate::listing::{annotate_likes, Annotated, Listing};
use crate::media::{MediaDescriptor, MediaStore, UploadedFile, IMAGE_UPLOAD_POLICY};
use crate::user::{User, UserCollection, UserStore};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const NO_SUCH_PLAYLIST: &str = "There isn't a playlist with that id.";

/// Multipart fields of a new playlist.
#[derive(Debug, Default)]
pub struct PlaylistDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    /// "public" makes the playlist public, anything else keeps it private.
    pub visibility: Option<String>,
    pub cover: Option<UploadedFile>,
}

/// Multipart fields of a playlist update.
#[derive(Debug, Default)]
pub struct PlaylistEdit {
    pub new_name: Option<String>,
    pub cover: Option<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub public: bool,
    pub cover: Option<MediaDescriptor>,
    pub created_by_user: usize,
    pub tracks_quantity: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistDetails {
    pub summary: PlaylistSummary,
    pub tracks: Vec<Annotated<Track>>,
}

/// A playlist after an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedPlaylist {
    pub name: String,
    pub cover: Option<MediaDescriptor>,
}

pub struct PlaylistManager {
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
    media: Arc<dyn MediaStore>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PlaylistManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        catalog: Arc<dyn CatalogStore>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            users,
            catalog,
            media,
        }
    }

    /// Looks the playlist up, 404 when it does not exist.
    fn existing(&self, playlist_id: &str) -> ServiceResult<Playlist> {
        if !is_valid_resource_id(playlist_id) {
            return Err(ServiceError::not_found(NO_SUCH_PLAYLIST));
        }
        self.catalog
            .get_playlist(playlist_id)?
            .ok_or_else(|| ServiceError::not_found(NO_SUCH_PLAYLIST))
    }

    /// Existence first, then ownership.
    fn owned(&self, user: &User, playlist_id: &str, not_owner: ServiceError) -> ServiceResult<Playlist> {
        let playlist = self.existing(playlist_id)?;
        if !is_owner(user.id, &playlist) {
            return Err(not_owner);
        }
        Ok(playlist)
    }

    fn cover_descriptor(&self, cover: &Option<UploadedFile>) -> ServiceResult<Option<MediaDescriptor>> {
        let Some(file) = cover else {
            return Ok(None);
        };
        let extension = IMAGE_UPLOAD_POLICY.accept(file)?;
        Ok(Some(
            self.media
                .descriptor(&format!("{}.{}", new_resource_id(), extension)),
        ))
    }

    async fn save_cover(
        &self,
        descriptor: &Option<MediaDescriptor>,
        file: Option<UploadedFile>,
    ) -> anyhow::Result<()> {
        match (descriptor, file) {
            (Some(descriptor), Some(file)) => self.media.save(&descriptor.name, file.bytes).await,
            _ => Ok(()),
        }
    }

    pub async fn create(&self, user: &User, draft: PlaylistDraft) -> ServiceResult<Playlist> {
        let name = non_blank(draft.name)
            .ok_or_else(|| ServiceError::validation("You need to provide a name for the playlist"))?;
        let cover = self.cover_descriptor(&draft.cover)?;
        let new_playlist = NewPlaylist {
            id: new_resource_id(),
            name,
            description: non_blank(draft.description),
            public: draft.visibility.as_deref() == Some("public"),
            cover: cover.clone(),
            created_by_user: user.id,
        };

        let (_, playlist, _) = tokio::try_join!(
            self.save_cover(&cover, draft.cover),
            async { self.catalog.insert_playlist(&new_playlist) },
            async {
                self.users
                    .add_to_collection(user.id, UserCollection::Playlists, &new_playlist.id)
            },
        )?;
        info!("User {} created playlist {}", user.id, playlist.id);
        Ok(playlist)
    }

    fn query(&self, scope: PlaylistScope, listing: &Listing) -> ServiceResult<Vec<Playlist>> {
        Ok(self.catalog.list_playlists(&PlaylistQuery {
            scope,
            search: listing.search.clone(),
            page: listing.page(),
        })?)
    }

    pub fn list_public(&self, listing: &Listing) -> ServiceResult<Vec<Playlist>> {
        self.query(PlaylistScope::Public, listing)
    }

    /// The caller's playlists, public and private.
    pub fn list_user(&self, user: &User, listing: &Listing) -> ServiceResult<Vec<Playlist>> {
        self.query(PlaylistScope::CreatedBy(user.id), listing)
    }

    /// A playlist with a window of its tracks. Private playlists are visible to
    /// anyone holding their id.
    pub fn details(
        &self,
        playlist_id: &str,
        viewer: Option<&User>,
        listing: &Listing,
    ) -> ServiceResult<PlaylistDetails> {
        let playlist = self.existing(playlist_id)?;
        let tracks = self.catalog.list_tracks(&TrackQuery {
            scope: TrackScope::InPlaylist(playlist.id.clone()),
            search: listing.search.clone(),
            page: listing.page(),
        })?;

        Ok(PlaylistDetails {
            summary: PlaylistSummary {
                tracks_quantity: playlist.tracks.len(),
                id: playlist.id,
                name: playlist.name,
                description: playlist.description,
                public: playlist.public,
                cover: playlist.cover,
                created_by_user: playlist.created_by_user,
                created_at: playlist.created_at,
            },
            tracks: annotate_likes(tracks, viewer.map(|v| &v.liked_tracks)),
        })
    }

    /// Returns the playlist name.
    pub fn add_track(&self, user: &User, playlist_id: &str, track_id: &str) -> ServiceResult<String> {
        let playlist = self.owned(
            user,
            playlist_id,
            ServiceError::authorization(
                "You didn't create this playlist, you can only add tracks to playlists that you have created.",
            )
            .with_status(StatusCode::UNAUTHORIZED),
        )?;
        let duplicate = || {
            ServiceError::authorization(format!(
                "This track already exists in the playlist {}, please choose another track.",
                playlist.name
            ))
        };
        if playlist.tracks.iter().any(|id| id == track_id) {
            return Err(duplicate());
        }
        if !is_valid_resource_id(track_id) || self.catalog.get_track(track_id)?.is_none() {
            return Err(ServiceError::not_found("There is no track with that id"));
        }
        if !self.catalog.add_playlist_track(&playlist.id, track_id)? {
            return Err(duplicate());
        }
        Ok(playlist.name)
    }

    pub fn remove_track(&self, user: &User, playlist_id: &str, track_id: &str) -> ServiceResult<()> {
        let playlist = self.owned(
            user,
            playlist_id,
            ServiceError::authorization(
                "You didn't create this playlist, you can only remove tracks from playlist that you have created.",
            )
            .with_status(StatusCode::UNAUTHORIZED),
        )?;
        if !self.catalog.remove_playlist_track(&playlist.id, track_id)? {
            return Err(ServiceError::not_found(
                "The track id sent doesn't exist in the playlist!",
            ));
        }
        Ok(())
    }

    /// Renames and/or re-covers a playlist. A replaced cover blob is deleted.
    pub async fn update(
        &self,
        user: &User,
        playlist_id: &str,
        edit: PlaylistEdit,
    ) -> ServiceResult<UpdatedPlaylist> {
        let new_name = non_blank(edit.new_name);
        if new_name.is_none() && edit.cover.is_none() {
            return Err(ServiceError::validation("You need to provide valid changes."));
        }
        let playlist = self.owned(
            user,
            playlist_id,
            ServiceError::authorization(
                "You didn't create this playlist, you can only update playlists that you have created.",
            )
            .with_status(StatusCode::UNAUTHORIZED),
        )?;
        let cover = self.cover_descriptor(&edit.cover)?;
        let changes = PlaylistChanges {
            name: new_name,
            cover: cover.clone(),
        };
        let previous_cover = match (&cover, &playlist.cover) {
            (Some(_), Some(previous)) => Some(previous.name.clone()),
            _ => None,
        };

        tokio::try_join!(
            async {
                match &previous_cover {
                    Some(name) => self.media.delete(name).await.map(|_| ()),
                    None => Ok(()),
                }
            },
            self.save_cover(&cover, edit.cover),
            async { self.catalog.update_playlist(&playlist.id, &changes) },
        )?;

        Ok(UpdatedPlaylist {
            name: changes.name.unwrap_or(playlist.name),
            cover: cover.or(playlist.cover),
        })
    }

    /// Returns the deleted playlist's name and the ids of the playlists the
    /// user still has.
    pub async fn delete(&self, user: &User, playlist_id: &str) -> ServiceResult<(String, Vec<String>)> {
        let playlist = self.owned(
            user,
            playlist_id,
            ServiceError::authorization("You can only delete playlist that you created!")
                .with_status(StatusCode::NOT_FOUND),
        )?;

        if let Some(cover) = &playlist.cover {
            if !self.media.delete(&cover.name).await? {
                warn!("Cover {} of playlist {} was already gone", cover.name, playlist.id);
            }
        }
        tokio::try_join!(
            async { self.catalog.delete_playlist(&playlist.id) },
            async {
                self.users
                    .remove_from_collection(user.id, UserCollection::Playlists, &playlist.id)
            },
        )?;

        let mut remaining: Vec<String> = self
            .users
            .get_collection(user.id, UserCollection::Playlists)?
            .into_iter()
            .collect();
        remaining.sort();
        info!("User {} deleted playlist {}", user.id, playlist.id);
        Ok((playlist.name, remaining))
    }
}
