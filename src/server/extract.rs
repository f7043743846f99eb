//! Request body extractors that reject with the service error shape.

use crate::error::{ServiceError, ServiceResult};
use crate::media::UploadedFile;
use axum::extract::{FromRequest, Multipart, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

/// `Json` whose rejections are `{"message": ...}` with a 400.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            debug!("Rejected JSON body: {}", rejection.body_text());
            ServiceError::validation(rejection.body_text())
        })?;
        Ok(JsonBody(value))
    }
}

/// Text fields and file parts of a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn collect(mut multipart: Multipart) -> ServiceResult<Self> {
        let mut form = MultipartForm::default();
        loop {
            let field = multipart.next_field().await.map_err(|err| {
                debug!("Malformed multipart body: {}", err);
                ServiceError::validation(format!("Invalid multipart body: {}", err.body_text()))
            })?;
            let Some(field) = field else {
                break;
            };
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(|err| {
                debug!("Could not read multipart field {}: {}", name, err);
                ServiceError::validation(format!("Invalid multipart body: {}", err.body_text()))
            })?;

            match file_name {
                Some(file_name) => {
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name: Some(file_name),
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    form.fields
                        .insert(name, String::from_utf8_lossy(&bytes).into_owned());
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}
