//! `/v1/users` routes: accounts, sessions and the caller's library.

use super::extract::{JsonBody, MultipartForm};
use super::metrics::{record_account_event, record_login_attempt, record_upload};
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedTrackManager, GuardedUserManager, ServerState};
use crate::error::ServiceResult;
use crate::listing::{ListParams, Listing};
use crate::user::tokens::SESSION_TOKEN_TTL;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;

pub(super) fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "message": text.into() }))).into_response()
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SigninBody {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct CredentialsBody {
    email: String,
    password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct EmailBody {
    email: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct UpdatePasswordBody {
    token: String,
    new_password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct TrackIdBody {
    track_id: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct NewUsernameBody {
    new_username: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct NewEmailBody {
    new_email: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct DeleteAccountBody {
    email: String,
    confirmation_token: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_SESSION_TOKEN_KEY, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TOKEN_TTL.as_secs() as i64))
        .build()
}

fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
        .same_site(SameSite::Lax)
        .build()
}

async fn signin(
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<SigninBody>,
) -> ServiceResult<Response> {
    user_manager
        .register(&body.username, &body.email, &body.password)
        .await?;
    record_account_event("registered");
    Ok(message(
        StatusCode::CREATED,
        "User created, please verify account!",
    ))
}

async fn verify_account(
    State(user_manager): State<GuardedUserManager>,
    Path(token): Path<String>,
) -> ServiceResult<Response> {
    user_manager.verify_account(&token)?;
    record_account_event("verified");
    Ok(message(StatusCode::OK, "Verified user"))
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    JsonBody(body): JsonBody<CredentialsBody>,
) -> ServiceResult<Response> {
    let start = Instant::now();
    let (user, session) = match user_manager.login(&body.email, &body.password) {
        Ok(logged) => {
            record_login_attempt("success", start.elapsed());
            logged
        }
        Err(err) => {
            record_login_attempt("failure", start.elapsed());
            return Err(err);
        }
    };

    let jar = jar.add(session_cookie(session.value.clone()));
    Ok((
        StatusCode::ACCEPTED,
        jar,
        Json(json!({
            "message": "Successfully logged in",
            "user": user,
            "token": session.value,
        })),
    )
        .into_response())
}

async fn logout(_session: Session, jar: CookieJar) -> Response {
    let jar = jar.add(expired_session_cookie());
    (jar, message(StatusCode::OK, "Logged out")).into_response()
}

async fn verify_token(session: Session) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Valid Token",
            "user": session.user.summary(),
        })),
    )
        .into_response()
}

async fn resend_verification_token(
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<CredentialsBody>,
) -> ServiceResult<Response> {
    user_manager
        .resend_verification(&body.email, &body.password)
        .await?;
    Ok(message(StatusCode::OK, "Token sent"))
}

async fn send_password_recovery_token(
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<EmailBody>,
) -> ServiceResult<Response> {
    user_manager.send_password_recovery(&body.email).await?;
    Ok(message(StatusCode::OK, "Token sent"))
}

async fn update_password(
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<UpdatePasswordBody>,
) -> ServiceResult<Response> {
    user_manager.update_password(&body.token, &body.new_password)?;
    record_account_event("password_reset");
    Ok(message(
        StatusCode::OK,
        "Password updated successfully, please login!",
    ))
}

async fn quantities(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Response {
    let quantities = user_manager.quantities(&session.user);
    (
        StatusCode::OK,
        Json(json!({
            "uploadedTracksQuantity": quantities.uploaded_tracks_quantity,
            "likedTracksQuantity": quantities.liked_tracks_quantity,
            "playlistsQuantity": quantities.playlists_quantity,
            "message": "Sent the quantities of uploaded tracks, liked tracks and playlists",
        })),
    )
        .into_response()
}

async fn set_liked_track(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<TrackIdBody>,
) -> ServiceResult<Response> {
    let liked = user_manager.like_track(&session.user, &body.track_id)?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Track added to liked tracks",
            "likedTracks": liked,
        })),
    )
        .into_response())
}

async fn remove_liked_track(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<TrackIdBody>,
) -> ServiceResult<Response> {
    let liked = user_manager.unlike_track(&session.user, &body.track_id)?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Track removed from liked tracks",
            "likedTracks": liked,
        })),
    )
        .into_response())
}

async fn get_liked_tracks(
    session: Session,
    State(track_manager): State<GuardedTrackManager>,
    Query(params): Query<ListParams>,
) -> ServiceResult<Response> {
    let listing = Listing::from_params(&params);
    let tracks = track_manager.list_liked(&session.user, &listing)?;
    Ok(Json(json!({
        "message": listing.message("liked tracks", "tracks"),
        "tracks": tracks,
    }))
    .into_response())
}

async fn get_uploaded_tracks(
    session: Session,
    State(track_manager): State<GuardedTrackManager>,
    Query(params): Query<ListParams>,
) -> ServiceResult<Response> {
    let listing = Listing::from_params(&params);
    let tracks = track_manager.list_uploaded(&session.user, &listing)?;
    Ok(Json(json!({
        "message": listing.message("uploaded tracks", "tracks"),
        "tracks": tracks,
    }))
    .into_response())
}

async fn upload_user_avatar(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    multipart: Multipart,
) -> ServiceResult<Response> {
    let mut form = MultipartForm::collect(multipart).await?;
    let file = form.take_file("avatar");
    let size = file.as_ref().map(|f| f.bytes.len()).unwrap_or(0);
    let avatar = user_manager
        .upload_avatar(&session.user, file)
        .await
        .inspect_err(|_| record_upload("avatar", false, 0))?;
    record_upload("avatar", true, size);
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Success uploading avatar!",
            "avatar": avatar,
        })),
    )
        .into_response())
}

async fn change_username(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<NewUsernameBody>,
) -> ServiceResult<Response> {
    let new_username = user_manager.change_username(&session.user, &body.new_username)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Username updated!",
            "newUsername": new_username,
        })),
    )
        .into_response())
}

async fn change_email(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<NewEmailBody>,
) -> ServiceResult<Response> {
    user_manager
        .change_email(&session.user, &body.new_email)
        .await?;
    Ok(message(StatusCode::OK, "Token sent"))
}

async fn confirm_new_email(
    State(user_manager): State<GuardedUserManager>,
    Path(token): Path<String>,
) -> ServiceResult<Response> {
    let new_email = user_manager.confirm_email_change(&token)?;
    record_account_event("email_changed");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Confirmed new email",
            "newEmail": new_email,
        })),
    )
        .into_response())
}

async fn send_delete_account_token(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<EmailBody>,
) -> ServiceResult<Response> {
    let email = user_manager
        .send_delete_account_token(&session.user, &body.email)
        .await?;
    Ok(message(
        StatusCode::OK,
        format!("Account deletion token was sent to {}", email),
    ))
}

async fn delete_account(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    JsonBody(body): JsonBody<DeleteAccountBody>,
) -> ServiceResult<Response> {
    let username = user_manager
        .delete_account(&session.user, &body.email, &body.confirmation_token)
        .await?;
    record_account_event("deleted");
    let jar = jar.add(expired_session_cookie());
    Ok((
        jar,
        message(StatusCode::OK, format!("{} account was deleted", username)),
    )
        .into_response())
}

pub fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/signin", post(signin))
        // Registration path of the deployed web client
        .route("/singin", post(signin))
        .route("/verify-account/{token}", get(verify_account))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/verify-token", get(verify_token))
        .route("/resend-verification-token", post(resend_verification_token))
        .route(
            "/send-password-recovery-token",
            post(send_password_recovery_token),
        )
        .route("/tracks-and-playlist-quantities", get(quantities))
        .route("/update-password", patch(update_password))
        .route("/set-liked-track", post(set_liked_track))
        .route("/remove-liked-track", delete(remove_liked_track))
        .route("/get-liked-tracks", get(get_liked_tracks))
        .route("/get-uploaded-tracks", get(get_uploaded_tracks))
        .route("/upload-user-avatar", patch(upload_user_avatar))
        .route("/change-username", patch(change_username))
        .route("/change-email", patch(change_email))
        .route("/confirm-new-email/{token}", patch(confirm_new_email))
        .route("/send-delete-account-token", patch(send_delete_account_token))
        .route("/delete-account", delete(delete_account))
        .with_state(state)
}
