//! Blob storage for audio files, covers and avatars.

mod fs_store;
mod upload;

pub use fs_store::FsMediaStore;
pub use upload::{UploadPolicy, UploadedFile, IMAGE_UPLOAD_POLICY, TRACK_UPLOAD_POLICY};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// A stored blob as referenced from records: its name in the store and the
/// URL clients fetch it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub name: String,
    pub url: String,
}

#[derive(Debug)]
pub struct StoredMedia {
    pub file: tokio::fs::File,
    pub size: u64,
    pub content_type: &'static str,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Overwrites any blob with the same name.
    async fn save(&self, name: &str, bytes: Bytes) -> Result<()>;

    /// Returns false if there was nothing to delete.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Returns Ok(None) if the blob does not exist.
    async fn open(&self, name: &str) -> Result<Option<StoredMedia>>;

    fn public_url(&self, name: &str) -> String;

    fn descriptor(&self, name: &str) -> MediaDescriptor {
        MediaDescriptor {
            name: name.to_string(),
            url: self.public_url(name),
        }
    }
}

/// Content type served for a blob, from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::content_type_for;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for("abc.mp3"), "audio/mpeg");
        assert_eq!(content_type_for("cover.JPG"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
