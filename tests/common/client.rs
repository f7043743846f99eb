//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest and provides methods for all server endpoints.
//! When API routes or request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

fn file_part(bytes: Vec<u8>, file_name: &str, mime: &str) -> Part {
    Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .expect("Invalid mime type")
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in with the given credentials
    ///
    /// # Panics
    ///
    /// Panics if the login fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String, email: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(email, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::ACCEPTED,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Home request failed")
    }

    /// POST /v1/users/signin
    pub async fn signin(&self, username: &str, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/v1/users/signin"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Signin request failed")
    }

    /// GET /v1/users/verify-account/{token}
    pub async fn verify_account(&self, token: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/users/verify-account/{}", token)))
            .send()
            .await
            .expect("Verify account request failed")
    }

    /// POST /v1/users/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/v1/users/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/users/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(self.url("/v1/users/logout"))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// GET /v1/users/verify-token
    pub async fn verify_token(&self) -> Response {
        self.client
            .get(self.url("/v1/users/verify-token"))
            .send()
            .await
            .expect("Verify token request failed")
    }

    /// POST /v1/users/resend-verification-token
    pub async fn resend_verification(&self, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/v1/users/resend-verification-token"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Resend verification request failed")
    }

    /// POST /v1/users/send-password-recovery-token
    pub async fn send_password_recovery(&self, email: &str) -> Response {
        self.client
            .post(self.url("/v1/users/send-password-recovery-token"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("Password recovery request failed")
    }

    /// PATCH /v1/users/update-password
    pub async fn update_password(&self, token: &str, new_password: &str) -> Response {
        self.client
            .patch(self.url("/v1/users/update-password"))
            .json(&json!({ "token": token, "newPassword": new_password }))
            .send()
            .await
            .expect("Update password request failed")
    }

    /// GET /v1/users/tracks-and-playlist-quantities
    pub async fn quantities(&self) -> Response {
        self.client
            .get(self.url("/v1/users/tracks-and-playlist-quantities"))
            .send()
            .await
            .expect("Quantities request failed")
    }

    /// POST /v1/users/set-liked-track
    pub async fn like_track(&self, track_id: &str) -> Response {
        self.client
            .post(self.url("/v1/users/set-liked-track"))
            .json(&json!({ "trackId": track_id }))
            .send()
            .await
            .expect("Like request failed")
    }

    /// DELETE /v1/users/remove-liked-track
    pub async fn unlike_track(&self, track_id: &str) -> Response {
        self.client
            .delete(self.url("/v1/users/remove-liked-track"))
            .json(&json!({ "trackId": track_id }))
            .send()
            .await
            .expect("Unlike request failed")
    }

    /// GET /v1/users/get-liked-tracks?{query}
    pub async fn get_liked_tracks(&self, query: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/users/get-liked-tracks?{}", query)))
            .send()
            .await
            .expect("Liked tracks request failed")
    }

    /// GET /v1/users/get-uploaded-tracks?{query}
    pub async fn get_uploaded_tracks(&self, query: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/users/get-uploaded-tracks?{}", query)))
            .send()
            .await
            .expect("Uploaded tracks request failed")
    }

    /// PATCH /v1/users/upload-user-avatar
    pub async fn upload_avatar(&self, bytes: Vec<u8>, mime: &str) -> Response {
        let form = Form::new().part("avatar", file_part(bytes, "avatar", mime));
        self.client
            .patch(self.url("/v1/users/upload-user-avatar"))
            .multipart(form)
            .send()
            .await
            .expect("Avatar upload request failed")
    }

    /// PATCH /v1/users/change-username
    pub async fn change_username(&self, new_username: &str) -> Response {
        self.client
            .patch(self.url("/v1/users/change-username"))
            .json(&json!({ "newUsername": new_username }))
            .send()
            .await
            .expect("Change username request failed")
    }

    /// PATCH /v1/users/change-email
    pub async fn change_email(&self, new_email: &str) -> Response {
        self.client
            .patch(self.url("/v1/users/change-email"))
            .json(&json!({ "newEmail": new_email }))
            .send()
            .await
            .expect("Change email request failed")
    }

    /// PATCH /v1/users/confirm-new-email/{token}
    pub async fn confirm_new_email(&self, token: &str) -> Response {
        self.client
            .patch(self.url(&format!("/v1/users/confirm-new-email/{}", token)))
            .send()
            .await
            .expect("Confirm email request failed")
    }

    /// PATCH /v1/users/send-delete-account-token
    pub async fn send_delete_account_token(&self, email: &str) -> Response {
        self.client
            .patch(self.url("/v1/users/send-delete-account-token"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("Delete account token request failed")
    }

    /// DELETE /v1/users/delete-account
    pub async fn delete_account(&self, email: &str, confirmation_token: &str) -> Response {
        self.client
            .delete(self.url("/v1/users/delete-account"))
            .json(&json!({ "email": email, "confirmationToken": confirmation_token }))
            .send()
            .await
            .expect("Delete account request failed")
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    /// GET /v1/tracks?{query}
    pub async fn get_tracks(&self, query: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/tracks?{}", query)))
            .send()
            .await
            .expect("Tracks request failed")
    }

    /// POST /v1/tracks/upload
    pub async fn upload_track(
        &self,
        name: Option<&str>,
        artist: Option<&str>,
        file: Option<(Vec<u8>, &str)>,
    ) -> Response {
        let mut form = Form::new();
        if let Some(name) = name {
            form = form.text("name", name.to_string());
        }
        if let Some(artist) = artist {
            form = form.text("artist", artist.to_string());
        }
        if let Some((bytes, mime)) = file {
            form = form.part("track", file_part(bytes, "track.mp3", mime));
        }
        self.client
            .post(self.url("/v1/tracks/upload"))
            .multipart(form)
            .send()
            .await
            .expect("Track upload request failed")
    }

    /// Uploads a valid mp3 and returns the new track id
    pub async fn upload_mp3(&self, name: &str, artist: &str) -> String {
        let response = self
            .upload_track(
                Some(name),
                Some(artist),
                Some((super::fixtures::mp3_bytes(), "audio/mpeg")),
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: serde_json::Value = response.json().await.expect("Invalid upload body");
        body["newTrack"]["_id"]
            .as_str()
            .expect("Upload response has no track id")
            .to_string()
    }

    /// GET /v1/tracks/{id}/mp3
    pub async fn stream_track(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/tracks/{}/mp3", id)))
            .send()
            .await
            .expect("Stream request failed")
    }

    /// GET /v1/tracks/{id}/download
    pub async fn download_track(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/tracks/{}/download", id)))
            .send()
            .await
            .expect("Download request failed")
    }

    /// DELETE /v1/tracks/delete
    pub async fn delete_track(&self, id: &str) -> Response {
        self.client
            .delete(self.url("/v1/tracks/delete"))
            .json(&json!({ "id": id }))
            .send()
            .await
            .expect("Delete track request failed")
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    /// GET /v1/playlists/get-playlists?{query}
    pub async fn get_playlists(&self, query: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/playlists/get-playlists?{}", query)))
            .send()
            .await
            .expect("Playlists request failed")
    }

    /// GET /v1/playlists/get-user-playlists?{query}
    pub async fn get_user_playlists(&self, query: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/playlists/get-user-playlists?{}", query)))
            .send()
            .await
            .expect("User playlists request failed")
    }

    /// GET /v1/playlists/get-playlist-details/{id}?{query}
    pub async fn get_playlist_details(&self, id: &str, query: &str) -> Response {
        self.client
            .get(self.url(&format!(
                "/v1/playlists/get-playlist-details/{}?{}",
                id, query
            )))
            .send()
            .await
            .expect("Playlist details request failed")
    }

    /// POST /v1/playlists/add
    pub async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        visibility: &str,
        cover: Option<(Vec<u8>, &str)>,
    ) -> Response {
        let mut form = Form::new()
            .text("name", name.to_string())
            .text("type", visibility.to_string());
        if let Some(description) = description {
            form = form.text("description", description.to_string());
        }
        if let Some((bytes, mime)) = cover {
            form = form.part("cover", file_part(bytes, "cover", mime));
        }
        self.client
            .post(self.url("/v1/playlists/add"))
            .multipart(form)
            .send()
            .await
            .expect("Create playlist request failed")
    }

    /// Creates a playlist and returns its id
    pub async fn create_playlist_id(&self, name: &str, visibility: &str) -> String {
        let response = self.create_playlist(name, None, visibility, None).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: serde_json::Value = response.json().await.expect("Invalid playlist body");
        body["newPlaylist"]["_id"]
            .as_str()
            .expect("Playlist response has no id")
            .to_string()
    }

    /// POST /v1/playlists/add-track
    pub async fn add_playlist_track(&self, playlist_id: &str, track_id: &str) -> Response {
        self.client
            .post(self.url("/v1/playlists/add-track"))
            .json(&json!({ "playlistId": playlist_id, "trackId": track_id }))
            .send()
            .await
            .expect("Add playlist track request failed")
    }

    /// PATCH /v1/playlists/update/{id}
    pub async fn update_playlist(
        &self,
        id: &str,
        new_name: Option<&str>,
        cover: Option<(Vec<u8>, &str)>,
    ) -> Response {
        let mut form = Form::new();
        if let Some(new_name) = new_name {
            form = form.text("newName", new_name.to_string());
        }
        if let Some((bytes, mime)) = cover {
            form = form.part("cover", file_part(bytes, "cover", mime));
        }
        self.client
            .patch(self.url(&format!("/v1/playlists/update/{}", id)))
            .multipart(form)
            .send()
            .await
            .expect("Update playlist request failed")
    }

    /// PATCH /v1/playlists/remove-track
    pub async fn remove_playlist_track(&self, playlist_id: &str, track_id: &str) -> Response {
        self.client
            .patch(self.url("/v1/playlists/remove-track"))
            .json(&json!({ "playlistId": playlist_id, "trackId": track_id }))
            .send()
            .await
            .expect("Remove playlist track request failed")
    }

    /// DELETE /v1/playlists/delete/{id}
    pub async fn delete_playlist(&self, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/v1/playlists/delete/{}", id)))
            .send()
            .await
            .expect("Delete playlist request failed")
    }
}
