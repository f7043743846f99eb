use super::{EmailMessage, EmailSender, EmailTemplate};
use crate::config::{EmailTemplateIds, SendGridSettings};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub struct SendGridEmailSender {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    templates: EmailTemplateIds,
    endpoint: String,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
    dynamic_template_data: &'a serde_json::Value,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    template_id: &'a str,
}

impl SendGridEmailSender {
    pub fn new(settings: &SendGridSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create SendGrid HTTP client")?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            from_email: settings.from_email.clone(),
            templates: settings.templates.clone(),
            endpoint: SENDGRID_SEND_URL.to_string(),
        })
    }

    fn template_id(&self, template: EmailTemplate) -> &str {
        match template {
            EmailTemplate::Registration => &self.templates.registration,
            EmailTemplate::PasswordRecovery => &self.templates.password_recovery,
            EmailTemplate::EmailChange => &self.templates.email_change,
            EmailTemplate::DeleteAccount => &self.templates.delete_account,
        }
    }
}

#[async_trait]
impl EmailSender for SendGridEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let request = SendRequest {
            personalizations: [Personalization {
                to: [Address { email: &message.to }],
                dynamic_template_data: &message.data,
            }],
            from: Address {
                email: &self.from_email,
            },
            template_id: self.template_id(message.template),
        };

        debug!("Sending {:?} email to {}", message.template, message.to);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("SendGrid request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("SendGrid rejected the message with status {}: {}", status, body);
        }
        Ok(())
    }
}
