use super::metrics::record_error;
use crate::error::{ErrorKind, ServiceError};
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::AlreadyExists => "already_exists",
        ErrorKind::Authentication => "authentication",
        ErrorKind::Authorization => "authorization",
        ErrorKind::Validation => "validation",
        ErrorKind::Internal => "internal",
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        record_error(kind_label(self.kind()));
        (self.status(), Json(json!({ "message": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn renders_message_with_overridden_status() {
        let response = ServiceError::not_found("There isn't a playlist with that id.")
            .with_status(StatusCode::UNAUTHORIZED)
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "There isn't a playlist with that id.");
    }
}
