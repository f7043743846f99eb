use crate::error::{ServiceError, ServiceResult};
use axum::body::Bytes;
use tracing::debug;

/// A file part received in a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// The declared content type, or a sniffed one when the client did not
    /// declare anything useful.
    pub fn media_type(&self) -> Option<String> {
        match self.content_type.as_deref() {
            Some(declared) if !declared.is_empty() && declared != "application/octet-stream" => {
                Some(declared.to_ascii_lowercase())
            }
            _ => infer::get(&self.bytes).map(|kind| kind.mime_type().to_string()),
        }
    }
}

/// Accepted media types (with the extension stored blobs get) and size cap.
pub struct UploadPolicy {
    pub accepted: &'static [(&'static str, &'static str)],
    pub max_bytes: usize,
    pub wrong_type_message: &'static str,
    pub too_large_message: &'static str,
}

pub const TRACK_UPLOAD_POLICY: UploadPolicy = UploadPolicy {
    accepted: &[("audio/mpeg", "mp3")],
    max_bytes: 12 * 1024 * 1024,
    wrong_type_message: "Wrong file type, you can only upload mp3 audio files.",
    too_large_message: "You can not upload files larger than 12mb in size",
};

pub const IMAGE_UPLOAD_POLICY: UploadPolicy = UploadPolicy {
    accepted: &[
        ("image/png", "png"),
        ("image/jpeg", "jpg"),
        ("image/webp", "webp"),
    ],
    max_bytes: 5 * 1024 * 1024,
    wrong_type_message:
        "Wrong file type, you can only upload images with these extensions: png, jpg or webp",
    too_large_message: "You can not upload files larger than 5mb in size",
};

impl UploadPolicy {
    /// Returns the extension to store the file with.
    pub fn accept(&self, file: &UploadedFile) -> ServiceResult<&'static str> {
        let media_type = file.media_type();
        let extension = media_type
            .as_deref()
            .and_then(|mt| {
                self.accepted
                    .iter()
                    .find(|(accepted, _)| *accepted == mt)
                    .map(|(_, ext)| *ext)
            })
            .ok_or_else(|| {
                debug!("Rejected upload with media type {:?}", media_type);
                ServiceError::validation(self.wrong_type_message)
            })?;

        if file.bytes.len() > self.max_bytes {
            debug!(
                "Rejected upload of {:#} (max {:#})",
                byte_unit::Byte::from(file.bytes.len()),
                byte_unit::Byte::from(self.max_bytes)
            );
            return Err(ServiceError::validation(self.too_large_message));
        }
        Ok(extension)
    }
}
