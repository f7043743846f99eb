//! Signed and opaque tokens.
//!
//! Account verification, password reset and email change use HS256 tokens that
//! bind the subject, the purpose and an expiry; the new address of an email
//! change travels inside the token. Account deletion uses a short random
//! opaque token, the caller proves identity again when redeeming it. Login
//! sessions are signed tokens too, with their own purpose and a longer life,
//! so a session token is never accepted where a confirmation is expected.

use super::pending::ConfirmationIntent;
use anyhow::{Context, Result};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const CONFIRMATION_TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);
pub const SESSION_TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);
pub const OPAQUE_TOKEN_LENGTH: usize = 21;
const NONCE_LENGTH: usize = 12;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    VerifyAccount,
    ResetPassword,
    ChangeEmail,
}

impl TokenPurpose {
    /// `None` for intents redeemed with an opaque token.
    pub fn for_intent(intent: ConfirmationIntent) -> Option<Self> {
        match intent {
            ConfirmationIntent::VerifyAccount => Some(TokenPurpose::VerifyAccount),
            ConfirmationIntent::ResetPassword => Some(TokenPurpose::ResetPassword),
            ConfirmationIntent::ChangeEmail => Some(TokenPurpose::ChangeEmail),
            ConfirmationIntent::DeleteAccount => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub purpose: TokenPurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Account email for sessions, the requested address for email changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<usize> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed or its signature does not match")]
    Invalid,
    #[error("token was issued for a different purpose")]
    WrongPurpose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    /// Unix seconds.
    pub expires_at: i64,
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_opaque_token() -> String {
    random_alphanumeric(OPAQUE_TOKEN_LENGTH)
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub(crate) fn issue_with_expiry(
        &self,
        user_id: usize,
        purpose: TokenPurpose,
        username: Option<&str>,
        email: Option<&str>,
        expires_at: i64,
    ) -> Result<IssuedToken> {
        let claims = Claims {
            sub: user_id.to_string(),
            purpose,
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            iat: now_secs(),
            exp: expires_at,
            jti: random_alphanumeric(NONCE_LENGTH),
        };
        let value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to sign token")?;
        Ok(IssuedToken { value, expires_at })
    }

    /// Mints the token for a confirmation flow. `new_email` is only carried by
    /// email change tokens.
    pub fn issue_confirmation(
        &self,
        user_id: usize,
        intent: ConfirmationIntent,
        new_email: Option<&str>,
    ) -> Result<IssuedToken> {
        let expires_at = now_secs() + CONFIRMATION_TOKEN_TTL.as_secs() as i64;
        match TokenPurpose::for_intent(intent) {
            Some(purpose) => {
                let email = match purpose {
                    TokenPurpose::ChangeEmail => new_email,
                    _ => None,
                };
                self.issue_with_expiry(user_id, purpose, None, email, expires_at)
            }
            None => Ok(IssuedToken {
                value: generate_opaque_token(),
                expires_at,
            }),
        }
    }

    pub fn issue_session(&self, user_id: usize, username: &str, email: &str) -> Result<IssuedToken> {
        self.issue_with_expiry(
            user_id,
            TokenPurpose::Session,
            Some(username),
            Some(email),
            now_secs() + SESSION_TOKEN_TTL.as_secs() as i64,
        )
    }

    /// Checks signature, expiry (no leeway) and purpose.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|err| match err.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?
            .claims;

        if claims.purpose != expected {
            return Err(TokenError::WrongPurpose);
        }
        if claims.user_id().is_none() {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}
