//! End-to-end tests for the token-confirmed account flows and profile edits

mod common;

use common::*;
use musicverse_server::email::EmailTemplate;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_password_recovery_flow() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.send_password_recovery("nobody@musicverse.test").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.send_password_recovery(TEST_EMAIL).await;
    assert_eq!(response.status(), StatusCode::OK);
    let link = server
        .last_email_link(TEST_EMAIL, EmailTemplate::PasswordRecovery)
        .unwrap();
    let token = token_from_link(&link);

    // Same password is refused and the token survives the attempt
    let response = client.update_password(&token, TEST_PASS).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.update_password(&token, "brand-new-pass").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.update_password(&token, "another-pass").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(
        client.login(TEST_EMAIL, TEST_PASS).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        client.login(TEST_EMAIL, "brand-new-pass").await.status(),
        StatusCode::ACCEPTED
    );
}

#[tokio::test]
async fn test_tokens_of_one_intent_do_not_confirm_another() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), TEST_EMAIL, TEST_PASS).await;

    client.send_password_recovery(TEST_EMAIL).await;
    let recovery = token_from_link(
        &server
            .last_email_link(TEST_EMAIL, EmailTemplate::PasswordRecovery)
            .unwrap(),
    );

    let response = client.confirm_new_email(&recovery).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = client.verify_account(&recovery).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_username() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), TEST_EMAIL, TEST_PASS).await;

    let response = client.change_username(OTHER_USER).await;
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    let response = client.change_username("renamed").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["newUsername"], "renamed");

    let body: Value = client.verify_token().await.json().await.unwrap();
    assert_eq!(body["user"]["username"], "renamed");
}

#[tokio::test]
async fn test_change_email_applies_only_on_confirmation() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), TEST_EMAIL, TEST_PASS).await;

    let response = client.change_email(OTHER_EMAIL).await;
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    let new_email = "moved@musicverse.test";
    let response = client.change_email(new_email).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Still the old address until confirmed
    let body: Value = client.verify_token().await.json().await.unwrap();
    assert_eq!(body["user"]["email"], TEST_EMAIL);

    let link = server
        .last_email_link(new_email, EmailTemplate::EmailChange)
        .expect("Confirmation goes to the new address");
    let token = token_from_link(&link);

    let response = client.confirm_new_email(&token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["newEmail"], new_email);

    let response = client.confirm_new_email(&token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(
        client.login(new_email, TEST_PASS).await.status(),
        StatusCode::ACCEPTED
    );
}

#[tokio::test]
async fn test_delete_account_requires_email_and_token() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), TEST_EMAIL, TEST_PASS).await;

    // Only the caller's own address
    let response = client.send_delete_account_token(OTHER_EMAIL).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.send_delete_account_token(TEST_EMAIL).await;
    assert_eq!(response.status(), StatusCode::OK);
    let message = server
        .emails
        .last_to(TEST_EMAIL, EmailTemplate::DeleteAccount)
        .unwrap();
    let token = message.data["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 21);

    let response = client.delete_account(TEST_EMAIL, "not-the-token").await;
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    let response = client.delete_account(TEST_EMAIL, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], format!("{} account was deleted", TEST_USER));

    assert_eq!(
        client.login(TEST_EMAIL, TEST_PASS).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_avatar_upload_replaces_previous_blob() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), TEST_EMAIL, TEST_PASS).await;

    let response = client.upload_avatar(b"plain text".to_vec(), "text/plain").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.upload_avatar(png_bytes(), "image/png").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let first = body["avatar"]["name"].as_str().unwrap().to_string();
    assert!(first.ends_with(".png"));
    let url = body["avatar"]["url"].as_str().unwrap().to_string();
    assert_eq!(url, format!("{}/v1/media/{}", server.base_url, first));

    // Served back through the media route
    let served = client.client.get(&url).send().await.unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.bytes().await.unwrap().to_vec(), png_bytes());

    let response = client.upload_avatar(png_bytes(), "image/png").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let second = body["avatar"]["name"].as_str().unwrap().to_string();

    assert_ne!(first, second);
    assert!(!server.media_dir.join(&first).exists());
    assert!(server.media_dir.join(&second).exists());

    let body: Value = client.verify_token().await.json().await.unwrap();
    assert_eq!(body["user"]["avatar"]["name"], second);
}

#[tokio::test]
async fn test_likes_and_quantities() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), TEST_EMAIL, TEST_PASS).await;

    let first = client.upload_mp3("first song", "some artist").await;
    let second = client.upload_mp3("second song", "some artist").await;
    client.create_playlist_id("Road Trip", "public").await;

    let response = client.like_track("not-an-id").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = client.like_track(MISSING_ID).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    client.like_track(&first).await;
    // Liking twice keeps a single entry
    let response = client.like_track(&first).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["likedTracks"], serde_json::json!([first.clone()]));

    client.like_track(&second).await;
    let response = client.unlike_track(&first).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["likedTracks"], serde_json::json!([second.clone()]));

    let response = client.quantities().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["uploadedTracksQuantity"], 2);
    assert_eq!(body["likedTracksQuantity"], 1);
    assert_eq!(body["playlistsQuantity"], 1);

    let body: Value = client.get_liked_tracks("").await.json().await.unwrap();
    let tracks = body["tracks"].as_array().unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0]["_id"], second.as_str());
    assert_eq!(tracks[0]["isLikedByLoggedUser"], true);
}
