use super::state::ServerState;
use crate::error::{ErrorKind, ServiceError};
use crate::user::User;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

/// The authenticated caller, loaded fresh from the store on every request.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Accepts both `Bearer <token>` and a bare token.
fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(HEADER_SESSION_TOKEN_KEY)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn extract_session_token(parts: &Parts) -> Option<String> {
    extract_session_token_from_cookies(parts).or_else(|| extract_session_token_from_headers(parts))
}

fn resolve_session(parts: &Parts, ctx: &ServerState) -> Result<Session, ServiceError> {
    let token = extract_session_token(parts).ok_or_else(|| {
        debug!("No token in cookies nor headers.");
        ServiceError::authentication("Not authenticated, please login")
    })?;
    let user = ctx.user_manager.session_user(&token)?;
    debug!("Resolved session of user_id={}", user.id);
    Ok(Session { user, token })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        resolve_session(parts, ctx)
    }
}

/// Optional authentication: a missing or bad token is an anonymous caller,
/// store failures still fail the request.
impl axum::extract::OptionalFromRequestParts<ServerState> for Session {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match resolve_session(parts, ctx) {
            Ok(session) => Ok(Some(session)),
            Err(err) if err.kind() == ErrorKind::Internal => Err(err),
            Err(_) => Ok(None),
        }
    }
}
