//! The single outstanding confirmation a user can have.
//!
//! Every "send me a token" flow stores its token here, overwriting whatever was
//! pending before. Confirming requires the presented token and the flow's
//! intent to match the slot, so a token minted for one flow can never complete
//! another, and a reissue silently retires the previous token.

use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmationIntent {
    VerifyAccount,
    ResetPassword,
    ChangeEmail,
    DeleteAccount,
}

impl ConfirmationIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationIntent::VerifyAccount => "verify_account",
            ConfirmationIntent::ResetPassword => "reset_password",
            ConfirmationIntent::ChangeEmail => "change_email",
            ConfirmationIntent::DeleteAccount => "delete_account",
        }
    }
}

impl fmt::Display for ConfirmationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmationIntent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "verify_account" => Ok(ConfirmationIntent::VerifyAccount),
            "reset_password" => Ok(ConfirmationIntent::ResetPassword),
            "change_email" => Ok(ConfirmationIntent::ChangeEmail),
            "delete_account" => Ok(ConfirmationIntent::DeleteAccount),
            _ => bail!("Unknown confirmation intent {}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PendingAction {
    #[default]
    None,
    Pending {
        token: String,
        intent: ConfirmationIntent,
        /// Unix seconds.
        expires_at: i64,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PendingRejection {
    #[error("no confirmation is pending")]
    NothingPending,
    #[error("pending confirmation is for a different action")]
    IntentMismatch,
    #[error("token does not match the pending confirmation")]
    TokenMismatch,
    #[error("pending confirmation has expired")]
    Expired,
}

impl PendingAction {
    pub fn pending(token: String, intent: ConfirmationIntent, expires_at: i64) -> Self {
        PendingAction::Pending {
            token,
            intent,
            expires_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PendingAction::Pending { .. })
    }

    /// Checks `token` against the slot without consuming it.
    pub fn check(
        &self,
        token: &str,
        intent: ConfirmationIntent,
        now: i64,
    ) -> Result<(), PendingRejection> {
        match self {
            PendingAction::None => Err(PendingRejection::NothingPending),
            PendingAction::Pending {
                token: pending_token,
                intent: pending_intent,
                expires_at,
            } => {
                if *pending_intent != intent {
                    Err(PendingRejection::IntentMismatch)
                } else if pending_token != token {
                    Err(PendingRejection::TokenMismatch)
                } else if now >= *expires_at {
                    Err(PendingRejection::Expired)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Consumes the slot when `token` and `intent` match. A rejection leaves
    /// the slot untouched.
    pub fn confirm(
        &mut self,
        token: &str,
        intent: ConfirmationIntent,
        now: i64,
    ) -> Result<(), PendingRejection> {
        self.check(token, intent, now)?;
        *self = PendingAction::None;
        Ok(())
    }
}
