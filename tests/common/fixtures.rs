//! Test data: seeded accounts, media bytes and a stub metadata provider.

use super::constants::*;
use async_trait::async_trait;
use musicverse_server::email::{EmailTemplate, RecordingEmailSender};
use musicverse_server::metadata::{TrackMetadata, TrackMetadataProvider};
use musicverse_server::user::UserManager;

/// Returns the same album and cover for every track.
pub struct StubMetadataProvider;

#[async_trait]
impl TrackMetadataProvider for StubMetadataProvider {
    async fn lookup(&self, _name: &str, _artist: &str) -> anyhow::Result<TrackMetadata> {
        Ok(TrackMetadata {
            album: Some(STUB_ALBUM.to_string()),
            cover: Some(STUB_COVER_URL.to_string()),
        })
    }
}

/// Last path segment of an emailed `{frontend}/auth/{route}/{token}/` link.
pub fn token_from_link(link: &str) -> String {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .expect("Link has no token segment")
        .to_string()
}

/// Registers and verifies an account through the manager.
pub async fn seed_verified_user(
    user_manager: &UserManager,
    emails: &RecordingEmailSender,
    username: &str,
    email: &str,
    password: &str,
) {
    user_manager
        .register(username, email, password)
        .await
        .expect("Failed to register seeded user");
    let message = emails
        .last_to(email, EmailTemplate::Registration)
        .expect("No registration email for seeded user");
    let link = message.data["link"]
        .as_str()
        .expect("Registration email has no link");
    user_manager
        .verify_account(&token_from_link(link))
        .expect("Failed to verify seeded user");
}

/// ID3 header followed by silence; uploads are accepted by declared type.
pub fn mp3_bytes() -> Vec<u8> {
    let mut bytes = b"ID3\x03\x00\x00\x00\x00\x00\x0f".to_vec();
    bytes.extend(std::iter::repeat(0u8).take(2048));
    bytes
}

pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend(std::iter::repeat(0u8).take(64));
    bytes
}
