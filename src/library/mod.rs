//! Track and playlist operations behind the HTTP routes.

mod playlist_manager;
mod track_manager;

pub use playlist_manager::{
    PlaylistDetails, PlaylistDraft, PlaylistEdit, PlaylistManager, PlaylistSummary,
    UpdatedPlaylist,
};
pub use track_manager::{TrackManager, TrackUpload};
