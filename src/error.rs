//! Error taxonomy shared by the managers and the HTTP layer.
//!
//! Every failure a request can end with is a [`ServiceError`]: a kind from the
//! taxonomy, the HTTP status the endpoint reports for it, and a human readable
//! message. Kinds carry a default status; endpoints that historically answer
//! with a different code override it with [`ServiceError::with_status`].

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resource, user or token subject is absent.
    NotFound,
    /// Uniqueness violation on username, email or track.
    AlreadyExists,
    /// Bad credential, invalid or expired token.
    Authentication,
    /// Caller is not the owner of the resource.
    Authorization,
    /// Missing or malformed fields, disallowed file type or size.
    Validation,
    /// Store, blob or upstream failure.
    Internal,
}

impl ErrorKind {
    pub fn default_status(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ServiceError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.default_status(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Keeps the kind but reports a different status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        // The chain goes to the log, callers only see a generic message.
        tracing::error!("Internal error: {:#}", err);
        ServiceError::internal("Something went wrong, please try again later")
    }
}
