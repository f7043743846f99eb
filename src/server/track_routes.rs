//! `/v1/tracks` routes.

use super::extract::{JsonBody, MultipartForm};
use super::metrics::{adjust_catalog_items, record_upload};
use super::session::Session;
use super::state::{GuardedTrackManager, ServerState};
use super::user_routes::message;
use crate::error::{ServiceError, ServiceResult};
use crate::library::TrackUpload;
use crate::listing::{ListParams, Listing};
use crate::media::StoredMedia;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct DeleteTrackBody {
    id: String,
}

/// Streams a stored blob with its type and length. Ranges are not honored,
/// the whole file is always sent.
fn media_response(media: StoredMedia) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, media.content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, media.size)
        .body(Body::from_stream(ReaderStream::new(media.file)))
        .unwrap_or_else(|err| {
            ServiceError::internal(format!("Could not build media response: {}", err))
                .into_response()
        })
}

/// `attachment` disposition, with an ASCII fallback name and the UTF-8 one.
fn attachment_disposition(track_name: &str) -> String {
    let file_name = format!("{}.mp3", track_name);
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(&file_name)
    )
}

async fn get_tracks(
    session: Option<Session>,
    State(track_manager): State<GuardedTrackManager>,
    Query(params): Query<ListParams>,
) -> ServiceResult<Response> {
    let listing = Listing::from_params(&params);
    let tracks = track_manager.list_all(session.as_ref().map(|s| &s.user), &listing)?;
    Ok(Json(json!({
        "tracks": tracks,
        "message": listing.message("tracks", "tracks"),
    }))
    .into_response())
}

async fn upload_track(
    session: Session,
    State(track_manager): State<GuardedTrackManager>,
    multipart: Multipart,
) -> ServiceResult<Response> {
    let mut form = MultipartForm::collect(multipart).await?;
    let upload = TrackUpload {
        name: form.text("name"),
        artist: form.text("artist"),
        file: form.take_file("track"),
    };
    let size = upload.file.as_ref().map(|f| f.bytes.len()).unwrap_or(0);
    let track = track_manager
        .upload(&session.user, upload)
        .await
        .inspect_err(|_| record_upload("track", false, 0))?;
    record_upload("track", true, size);
    adjust_catalog_items("track", 1.0);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Track uploaded successfully.",
            "newTrack": track,
        })),
    )
        .into_response())
}

async fn stream_track(
    State(track_manager): State<GuardedTrackManager>,
    Path(id): Path<String>,
) -> ServiceResult<Response> {
    let audio = track_manager.open_audio(&id).await?;
    debug!("Streaming track {} ({} bytes)", id, audio.size);
    Ok(media_response(audio))
}

async fn download_track(
    State(track_manager): State<GuardedTrackManager>,
    Path(id): Path<String>,
) -> ServiceResult<Response> {
    let (track, audio) = track_manager.download(&id).await?;
    debug!("Downloading track {} ({} bytes)", track.id, audio.size);
    let mut response = media_response(audio);
    if let Ok(value) = attachment_disposition(&track.name).parse() {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

async fn delete_track(
    session: Session,
    State(track_manager): State<GuardedTrackManager>,
    JsonBody(body): JsonBody<DeleteTrackBody>,
) -> ServiceResult<Response> {
    track_manager.delete(&session.user, &body.id).await?;
    adjust_catalog_items("track", -1.0);
    Ok(message(StatusCode::OK, "Track deleted"))
}

pub fn make_track_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(get_tracks))
        .route("/upload", post(upload_track))
        .route("/{id}/mp3", get(stream_track))
        .route("/{id}/download", get(download_track))
        .route("/delete", delete(delete_track))
        .with_state(state)
}
