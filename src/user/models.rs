use super::pending::PendingAction;
use crate::media::MediaDescriptor;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: usize,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    pub pending: PendingAction,
    pub avatar: Option<MediaDescriptor>,
    pub uploaded_tracks: HashSet<String>,
    pub liked_tracks: HashSet<String>,
    pub playlists: HashSet<String>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            user_id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// What a client gets to see about an account.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: usize,
    pub username: String,
    pub email: String,
    pub avatar: Option<MediaDescriptor>,
}

/// Sets of ids hanging off a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCollection {
    UploadedTracks,
    LikedTracks,
    Playlists,
}

impl UserCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserCollection::UploadedTracks => "uploaded_track",
            UserCollection::LikedTracks => "liked_track",
            UserCollection::Playlists => "playlist",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Fields to change on a user row. `None` leaves a field as it is; all
/// changes are written together.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub verified: Option<bool>,
    pub pending: Option<PendingAction>,
    pub avatar: Option<Option<MediaDescriptor>>,
}

impl AccountUpdate {
    pub fn pending(pending: PendingAction) -> Self {
        Self {
            pending: Some(pending),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuantities {
    pub uploaded_tracks_quantity: usize,
    pub liked_tracks_quantity: usize,
    pub playlists_quantity: usize,
}
