use axum::extract::FromRef;

use crate::library::{PlaylistManager, TrackManager};
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedTrackManager = Arc<TrackManager>;
pub type GuardedPlaylistManager = Arc<PlaylistManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub user_manager: GuardedUserManager,
    pub track_manager: GuardedTrackManager,
    pub playlist_manager: GuardedPlaylistManager,
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedTrackManager {
    fn from_ref(input: &ServerState) -> Self {
        input.track_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedPlaylistManager {
    fn from_ref(input: &ServerState) -> Self {
        input.playlist_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
