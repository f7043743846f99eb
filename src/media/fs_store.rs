use super::{content_type_for, MediaStore, StoredMedia};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Keeps blobs as flat files under one directory. Blob names never contain
/// path separators.
#[derive(Clone)]
pub struct FsMediaStore {
    root: PathBuf,
    public_base_url: String,
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !valid {
        bail!("Invalid media name {:?}", name);
    }
    Ok(())
}

impl FsMediaStore {
    /// `public_base_url` is the server's public address, blobs are served
    /// from `{public_base_url}/v1/media/{name}`.
    pub fn new<P: AsRef<Path>>(root: P, public_base_url: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create media directory {:?}", root))?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn save(&self, name: &str, bytes: Bytes) -> Result<()> {
        let path = self.path_for(name)?;
        debug!("Saving {} bytes to {:?}", bytes.len(), path);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write media {:?}", path))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("Failed to delete media {:?}", path)),
        }
    }

    async fn open(&self, name: &str) -> Result<Option<StoredMedia>> {
        // Names come from URLs here, a bad one simply does not exist.
        let Ok(path) = self.path_for(name) else {
            return Ok(None);
        };
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to open media {:?}", path))
            }
        };
        let size = file.metadata().await?.len();
        Ok(Some(StoredMedia {
            file,
            size,
            content_type: content_type_for(name),
        }))
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/v1/media/{}", self.public_base_url, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn store() -> (FsMediaStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsMediaStore::new(dir.path().join("media"), "http://localhost:3001/").unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn save_open_delete() {
        let (store, _dir) = store();
        store
            .save("abc.mp3", Bytes::from_static(b"ID3 fake"))
            .await
            .unwrap();

        let mut stored = store.open("abc.mp3").await.unwrap().unwrap();
        assert_eq!(stored.size, 8);
        assert_eq!(stored.content_type, "audio/mpeg");
        let mut content = Vec::new();
        stored.file.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"ID3 fake");

        assert!(store.delete("abc.mp3").await.unwrap());
        assert!(!store.delete("abc.mp3").await.unwrap());
        assert!(store.open("abc.mp3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let (store, _dir) = store();
        assert!(store.save("../escape.mp3", Bytes::new()).await.is_err());
        assert!(store.open("../../etc/passwd").await.unwrap().is_none());
        assert!(store.delete(".hidden").await.is_err());
    }

    #[test]
    fn public_urls() {
        let (store, _dir) = store();
        assert_eq!(
            store.public_url("x.png"),
            "http://localhost:3001/v1/media/x.png"
        );
        assert_eq!(store.descriptor("x.png").name, "x.png");
    }
}
