//! `/v1/playlists` routes.

use super::extract::{JsonBody, MultipartForm};
use super::metrics::{adjust_catalog_items, record_upload};
use super::session::Session;
use super::state::{GuardedPlaylistManager, ServerState};
use super::user_routes::message;
use crate::error::ServiceResult;
use crate::library::{PlaylistDraft, PlaylistEdit};
use crate::listing::{ListParams, Listing};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct PlaylistTrackBody {
    playlist_id: String,
    track_id: String,
}

async fn get_playlists(
    State(playlist_manager): State<GuardedPlaylistManager>,
    Query(params): Query<ListParams>,
) -> ServiceResult<Response> {
    let listing = Listing::from_params(&params);
    let playlists = playlist_manager.list_public(&listing)?;
    Ok(Json(json!({
        "playlists": playlists,
        "message": listing.message("playlists", "playlists"),
    }))
    .into_response())
}

async fn get_user_playlists(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Query(params): Query<ListParams>,
) -> ServiceResult<Response> {
    let listing = Listing::from_params(&params);
    let playlists = playlist_manager.list_user(&session.user, &listing)?;
    let mut body = json!({
        "playlists": playlists,
        "message": listing.message("playlists", "playlists"),
    });
    if listing.is_paginated() {
        body["userPlaylistsQuantity"] = json!(session.user.playlists.len());
    }
    Ok(Json(body).into_response())
}

async fn get_playlist_details(
    session: Option<Session>,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Path(playlist_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ServiceResult<Response> {
    let listing = Listing::from_params(&params);
    let details =
        playlist_manager.details(&playlist_id, session.as_ref().map(|s| &s.user), &listing)?;
    Ok(Json(json!({
        "message": format!(
            "Sended {} playlist's data and its tracks {}",
            details.summary.name,
            listing.describe("tracks")
        ),
        "playlistDetails": details.summary,
        "tracks": details.tracks,
    }))
    .into_response())
}

async fn add_playlist(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    multipart: Multipart,
) -> ServiceResult<Response> {
    let mut form = MultipartForm::collect(multipart).await?;
    let draft = PlaylistDraft {
        name: form.text("name"),
        // Older clients send the misspelled field.
        description: form.text("description").or_else(|| form.text("desciption")),
        visibility: form.text("type"),
        cover: form.take_file("cover"),
    };
    let cover_size = draft.cover.as_ref().map(|f| f.bytes.len());
    let playlist = playlist_manager
        .create(&session.user, draft)
        .await
        .inspect_err(|_| {
            if cover_size.is_some() {
                record_upload("cover", false, 0)
            }
        })?;
    if let Some(size) = cover_size {
        record_upload("cover", true, size);
    }
    adjust_catalog_items("playlist", 1.0);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Success creating playlist!",
            "newPlaylist": playlist,
        })),
    )
        .into_response())
}

async fn add_track(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    JsonBody(body): JsonBody<PlaylistTrackBody>,
) -> ServiceResult<Response> {
    let name = playlist_manager.add_track(&session.user, &body.playlist_id, &body.track_id)?;
    Ok(message(
        StatusCode::CREATED,
        format!("Song added to playlist: {}", name),
    ))
}

async fn update_playlist(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Path(playlist_id): Path<String>,
    multipart: Multipart,
) -> ServiceResult<Response> {
    let mut form = MultipartForm::collect(multipart).await?;
    let edit = PlaylistEdit {
        new_name: form.text("newName"),
        cover: form.take_file("cover"),
    };
    let cover_size = edit.cover.as_ref().map(|f| f.bytes.len());
    let changes = playlist_manager
        .update(&session.user, &playlist_id, edit)
        .await?;
    if let Some(size) = cover_size {
        record_upload("cover", true, size);
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Success updating playlist!",
            "changes": changes,
        })),
    )
        .into_response())
}

async fn remove_track(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    JsonBody(body): JsonBody<PlaylistTrackBody>,
) -> ServiceResult<Response> {
    playlist_manager.remove_track(&session.user, &body.playlist_id, &body.track_id)?;
    Ok(message(StatusCode::OK, "Track deleted successfully."))
}

async fn delete_playlist(
    session: Session,
    State(playlist_manager): State<GuardedPlaylistManager>,
    Path(playlist_id): Path<String>,
) -> ServiceResult<Response> {
    let (name, remaining) = playlist_manager
        .delete(&session.user, &playlist_id)
        .await?;
    adjust_catalog_items("playlist", -1.0);
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("{} playlist was deleted.", name),
            "userPlaylists": remaining,
        })),
    )
        .into_response())
}

pub fn make_playlist_routes(state: ServerState) -> Router {
    Router::new()
        .route("/get-playlists", get(get_playlists))
        .route("/get-user-playlists", get(get_user_playlists))
        .route("/get-playlist-details/{id}", get(get_playlist_details))
        .route("/add", post(add_playlist))
        .route("/add-track", post(add_track))
        .route("/update/{id}", patch(update_playlist))
        .route("/remove-track", patch(remove_track))
        .route("/delete/{id}", delete(delete_playlist))
        .with_state(state)
}
