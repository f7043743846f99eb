//! Transactional email delivery.
//!
//! Account flows build an [`EmailMessage`] naming one of the fixed templates
//! plus the data it needs, and hand it to an [`EmailSender`]. In production
//! that is SendGrid with dynamic templates; without credentials the server
//! falls back to [`LogEmailSender`].

mod sendgrid;

pub use sendgrid::SendGridEmailSender;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    Registration,
    PasswordRecovery,
    EmailChange,
    DeleteAccount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub template: EmailTemplate,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Logs messages instead of delivering them.
#[derive(Clone, Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            template = ?message.template,
            data = %message.data,
            "email delivery disabled, logging message"
        );
        Ok(())
    }
}

/// Keeps every message in memory, in sending order.
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Most recent message sent to `to` with `template`.
    pub fn last_to(&self, to: &str, template: EmailTemplate) -> Option<EmailMessage> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.to == to && m.template == template)
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("Recorded emails lock is poisoned"))?
            .push(message.clone());
        Ok(())
    }
}
