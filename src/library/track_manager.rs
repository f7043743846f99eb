use crate::catalog_store::{
    is_owner, is_valid_resource_id, new_resource_id, track_blob_name, CatalogStore, NewTrack,
    Track, TrackQuery, TrackScope,
};
use crate::error::{ServiceError, ServiceResult};
use crate::listing::{annotate_likes, Annotated, Listing};
use crate::media::{MediaStore, StoredMedia, UploadedFile, TRACK_UPLOAD_POLICY};
use crate::metadata::{capitalize_words, TrackMetadata, TrackMetadataProvider};
use crate::user::{User, UserCollection, UserStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Multipart fields of an upload.
#[derive(Debug, Default)]
pub struct TrackUpload {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub file: Option<UploadedFile>,
}

pub struct TrackManager {
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
    media: Arc<dyn MediaStore>,
    metadata: Arc<dyn TrackMetadataProvider>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TrackManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        catalog: Arc<dyn CatalogStore>,
        media: Arc<dyn MediaStore>,
        metadata: Arc<dyn TrackMetadataProvider>,
    ) -> Self {
        Self {
            users,
            catalog,
            media,
            metadata,
        }
    }

    pub async fn upload(&self, user: &User, upload: TrackUpload) -> ServiceResult<Track> {
        let file = upload
            .file
            .ok_or_else(|| ServiceError::validation("You need to send a valid mp3 audio file."))?;
        TRACK_UPLOAD_POLICY.accept(&file)?;
        let (Some(name), Some(artist)) = (non_blank(upload.name), non_blank(upload.artist)) else {
            return Err(ServiceError::validation(
                "Lack of information in body, you need to provide a valid name and artist!",
            ));
        };
        let name = capitalize_words(&name);
        let artist = capitalize_words(&artist);

        if self.catalog.find_track(&name, &artist)?.is_some() {
            return Err(ServiceError::already_exists("This track already exists!"));
        }

        let metadata = match self.metadata.lookup(&name, &artist).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Metadata lookup for {} - {} failed: {:#}", artist, name, err);
                TrackMetadata::default()
            }
        };

        let id = new_resource_id();
        let blob_name = track_blob_name(&id);
        let new_track = NewTrack {
            id: id.clone(),
            name,
            artist,
            album: metadata.album,
            cover: metadata.cover,
            url: self.media.public_url(&blob_name),
            uploaded_by_user: user.id,
        };

        let (_, track, _) = tokio::try_join!(
            self.media.save(&blob_name, file.bytes),
            async { self.catalog.insert_track(&new_track) },
            async {
                self.users
                    .add_to_collection(user.id, UserCollection::UploadedTracks, &id)
            },
        )?;
        info!("User {} uploaded track {}", user.id, track.id);
        Ok(track)
    }

    fn list(
        &self,
        scope: TrackScope,
        listing: &Listing,
        liked: Option<&HashSet<String>>,
    ) -> ServiceResult<Vec<Annotated<Track>>> {
        let tracks = self.catalog.list_tracks(&TrackQuery {
            scope,
            search: listing.search.clone(),
            page: listing.page(),
        })?;
        Ok(annotate_likes(tracks, liked))
    }

    /// All tracks. With a viewer each track says whether the viewer liked it.
    pub fn list_all(
        &self,
        viewer: Option<&User>,
        listing: &Listing,
    ) -> ServiceResult<Vec<Annotated<Track>>> {
        self.list(TrackScope::All, listing, viewer.map(|v| &v.liked_tracks))
    }

    pub fn list_liked(&self, user: &User, listing: &Listing) -> ServiceResult<Vec<Annotated<Track>>> {
        let ids = user.liked_tracks.iter().cloned().collect();
        self.list(TrackScope::Ids(ids), listing, Some(&user.liked_tracks))
    }

    pub fn list_uploaded(
        &self,
        user: &User,
        listing: &Listing,
    ) -> ServiceResult<Vec<Annotated<Track>>> {
        let ids = user.uploaded_tracks.iter().cloned().collect();
        self.list(TrackScope::Ids(ids), listing, Some(&user.liked_tracks))
    }

    /// The audio blob of a track.
    pub async fn open_audio(&self, track_id: &str) -> ServiceResult<StoredMedia> {
        if !is_valid_resource_id(track_id) {
            return Err(ServiceError::not_found("This track doesn't exist!"));
        }
        self.media
            .open(&track_blob_name(track_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("This track doesn't exist!"))
    }

    /// The track record and its audio, for downloads.
    pub async fn download(&self, track_id: &str) -> ServiceResult<(Track, StoredMedia)> {
        let track = self
            .catalog
            .get_track(track_id)?
            .ok_or_else(|| ServiceError::not_found("This track doesn't exist!"))?;
        let audio = self.open_audio(&track.id).await?;
        Ok((track, audio))
    }

    pub async fn delete(&self, user: &User, track_id: &str) -> ServiceResult<()> {
        let track = self.catalog.get_track(track_id)?.ok_or_else(|| {
            ServiceError::not_found("There is no track with that id, please try again")
                .with_status(axum::http::StatusCode::UNAUTHORIZED)
        })?;
        if !is_owner(user.id, &track) {
            return Err(ServiceError::authorization(
                "You didn't upload this track, you can only delete tracks uploaded by you!",
            ));
        }

        let blob_name = track_blob_name(&track.id);
        tokio::try_join!(
            async { self.catalog.delete_track(&track.id) },
            self.media.delete(&blob_name),
            async {
                self.users
                    .remove_from_collection(user.id, UserCollection::UploadedTracks, &track.id)
            },
        )?;
        info!("User {} deleted track {}", user.id, track.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::SqliteCatalogStore;
    use crate::error::ErrorKind;
    use crate::listing::ListParams;
    use crate::media::FsMediaStore;
    use crate::user::{NewUser, SqliteUserStore};
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use tempfile::TempDir;

    struct FixedMetadata(Option<TrackMetadata>);

    #[async_trait]
    impl TrackMetadataProvider for FixedMetadata {
        async fn lookup(&self, _name: &str, _artist: &str) -> Result<TrackMetadata> {
            self.0
                .clone()
                .ok_or_else(|| anyhow::anyhow!("lookup service unavailable"))
        }
    }

    struct Fixture {
        manager: TrackManager,
        users: Arc<SqliteUserStore>,
        _dir: TempDir,
    }

    fn fixture(metadata: Option<TrackMetadata>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let users = Arc::new(SqliteUserStore::new(dir.path().join("user.db")).unwrap());
        let manager = TrackManager::new(
            users.clone(),
            Arc::new(SqliteCatalogStore::new(dir.path().join("catalog.db")).unwrap()),
            Arc::new(FsMediaStore::new(dir.path().join("media"), "http://localhost:3001").unwrap()),
            Arc::new(FixedMetadata(metadata)),
        );
        Fixture {
            manager,
            users,
            _dir: dir,
        }
    }

    fn user(f: &Fixture, name: &str) -> User {
        let id = f
            .users
            .create_user(&NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "x".to_string(),
            })
            .unwrap();
        f.users.get_user(id).unwrap().unwrap()
    }

    fn mp3_upload(name: &str, artist: &str) -> TrackUpload {
        TrackUpload {
            name: Some(name.to_string()),
            artist: Some(artist.to_string()),
            file: Some(UploadedFile {
                file_name: Some("song.mp3".to_string()),
                content_type: Some("audio/mpeg".to_string()),
                bytes: Bytes::from_static(b"ID3\x03\x00fake mp3"),
            }),
        }
    }

    fn default_listing() -> Listing {
        Listing::from_params(&ListParams::default())
    }

    #[tokio::test]
    async fn upload_formats_and_enriches() {
        let f = fixture(Some(TrackMetadata {
            album: Some("Evolve".to_string()),
            cover: Some("http://img/xl.png".to_string()),
        }));
        let owner = user(&f, "owner");

        let track = f
            .manager
            .upload(&owner, mp3_upload("  believer ", "imagine dragons"))
            .await
            .unwrap();
        assert_eq!(track.name, "Believer");
        assert_eq!(track.artist, "Imagine Dragons");
        assert_eq!(track.album.as_deref(), Some("Evolve"));
        assert_eq!(
            track.url,
            format!("http://localhost:3001/v1/media/{}.mp3", track.id)
        );

        let audio = f.manager.open_audio(&track.id).await.unwrap();
        assert_eq!(audio.content_type, "audio/mpeg");

        let owner = f.users.get_user(owner.id).unwrap().unwrap();
        assert!(owner.uploaded_tracks.contains(&track.id));

        // Only the first letter of each word is normalized.
        assert!(f
            .manager
            .upload(&owner, mp3_upload("Believer", "Imagine  dragons"))
            .await
            .is_ok());
        assert!(f
            .manager
            .upload(&owner, mp3_upload("BELIEVER", "imagine dragons"))
            .await
            .is_ok());
        let err = f
            .manager
            .upload(&owner, mp3_upload("believer", "Imagine Dragons"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn upload_survives_metadata_failure() {
        let f = fixture(None);
        let owner = user(&f, "owner");
        let track = f
            .manager
            .upload(&owner, mp3_upload("demo", "nobody"))
            .await
            .unwrap();
        assert_eq!(track.album, None);
        assert_eq!(track.cover, None);
    }

    #[tokio::test]
    async fn upload_validation() {
        let f = fixture(None);
        let owner = user(&f, "owner");

        let mut missing_file = mp3_upload("a", "b");
        missing_file.file = None;
        let err = f.manager.upload(&owner, missing_file).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut wrong_type = mp3_upload("a", "b");
        if let Some(file) = wrong_type.file.as_mut() {
            file.content_type = Some("audio/ogg".to_string());
        }
        let err = f.manager.upload(&owner, wrong_type).await.unwrap_err();
        assert_eq!(err.message(), TRACK_UPLOAD_POLICY.wrong_type_message);

        let err = f
            .manager
            .upload(&owner, mp3_upload("a", "  "))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_checks_existence_then_ownership() {
        let f = fixture(None);
        let owner = user(&f, "owner");
        let stranger = user(&f, "stranger");
        let track = f
            .manager
            .upload(&owner, mp3_upload("mine", "me"))
            .await
            .unwrap();

        let err = f
            .manager
            .delete(&stranger, &new_resource_id())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = f.manager.delete(&stranger, &track.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        f.manager.delete(&owner, &track.id).await.unwrap();
        assert_eq!(
            f.manager.open_audio(&track.id).await.unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
        assert!(f
            .manager
            .list_all(None, &default_listing())
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn listings_annotate_likes() {
        let f = fixture(None);
        let owner = user(&f, "owner");
        let liked = f.manager.upload(&owner, mp3_upload("one", "x")).await.unwrap();
        f.manager.upload(&owner, mp3_upload("two", "x")).await.unwrap();
        f.users
            .add_to_collection(owner.id, UserCollection::LikedTracks, &liked.id)
            .unwrap();
        let owner = f.users.get_user(owner.id).unwrap().unwrap();

        let anonymous = f.manager.list_all(None, &default_listing()).unwrap();
        assert_eq!(anonymous.len(), 2);
        assert!(anonymous.iter().all(|t| t.is_liked_by_logged_user.is_none()));

        let viewed = f.manager.list_all(Some(&owner), &default_listing()).unwrap();
        assert_eq!(viewed[0].item.name, "Two");
        assert_eq!(viewed[0].is_liked_by_logged_user, Some(false));
        assert_eq!(viewed[1].is_liked_by_logged_user, Some(true));

        let liked_list = f.manager.list_liked(&owner, &default_listing()).unwrap();
        assert_eq!(liked_list.len(), 1);
        assert_eq!(liked_list[0].is_liked_by_logged_user, Some(true));

        let uploaded = f.manager.list_uploaded(&owner, &default_listing()).unwrap();
        assert_eq!(uploaded.len(), 2);
    }
}
