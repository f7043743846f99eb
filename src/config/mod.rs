mod file_config;

pub use file_config::{FileConfig, SendGridConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// Settings that can come from the command line (or its env fallbacks).
/// Every one of them can be overridden by the TOML file.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub public_url: Option<String>,
    pub frontend_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub lastfm_api_key: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_from_email: Option<String>,
    pub sendgrid_registration_template_id: Option<String>,
    pub sendgrid_password_recovery_template_id: Option<String>,
    pub sendgrid_email_change_template_id: Option<String>,
    pub sendgrid_delete_account_template_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub media_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Base URL media links are built on.
    pub public_url: String,
    /// Base URL of the web client, used in emailed links.
    pub frontend_url: String,
    pub jwt_secret: String,
    pub lastfm_api_key: Option<String>,
    /// `None` means emails are only logged.
    pub sendgrid: Option<SendGridSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendGridSettings {
    pub api_key: String,
    pub from_email: String,
    pub templates: EmailTemplateIds,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmailTemplateIds {
    pub registration: String,
    pub password_recovery: String,
    pub email_change: String,
    pub delete_account: String,
}

const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const MIN_JWT_SECRET_LEN: usize = 16;

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;
        if !db_dir.is_dir() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }

        let media_path = file
            .media_path
            .map(PathBuf::from)
            .or_else(|| cli.media_path.clone())
            .unwrap_or_else(|| db_dir.join("media"));

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let public_url = file
            .public_url
            .or_else(|| cli.public_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}", port));
        let frontend_url = file
            .frontend_url
            .or_else(|| cli.frontend_url.clone())
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());

        let jwt_secret = file
            .jwt_secret
            .or_else(|| cli.jwt_secret.clone())
            .ok_or_else(|| anyhow!("jwt_secret must be specified via --jwt-secret, JWT_SECRET or in config file"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!(
                "jwt_secret must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            );
        }

        let lastfm_api_key = file
            .lastfm_api_key
            .or_else(|| cli.lastfm_api_key.clone())
            .filter(|k| !k.is_empty());

        let sendgrid = resolve_sendgrid(cli, file.sendgrid.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            media_path,
            port,
            metrics_port,
            logging_level,
            public_url: public_url.trim_end_matches('/').to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            jwt_secret,
            lastfm_api_key,
            sendgrid,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }
}

fn resolve_sendgrid(cli: &CliConfig, file: SendGridConfig) -> Result<Option<SendGridSettings>> {
    let Some(api_key) = file
        .api_key
        .or_else(|| cli.sendgrid_api_key.clone())
        .filter(|k| !k.is_empty())
    else {
        return Ok(None);
    };

    let require = |value: Option<String>, name: &str| -> Result<String> {
        value.ok_or_else(|| anyhow!("sendgrid {} is required when an api key is set", name))
    };

    Ok(Some(SendGridSettings {
        api_key,
        from_email: require(
            file.from_email.or_else(|| cli.sendgrid_from_email.clone()),
            "from_email",
        )?,
        templates: EmailTemplateIds {
            registration: require(
                file.registration_template_id
                    .or_else(|| cli.sendgrid_registration_template_id.clone()),
                "registration_template_id",
            )?,
            password_recovery: require(
                file.password_recovery_template_id
                    .or_else(|| cli.sendgrid_password_recovery_template_id.clone()),
                "password_recovery_template_id",
            )?,
            email_change: require(
                file.email_change_template_id
                    .or_else(|| cli.sendgrid_email_change_template_id.clone()),
                "email_change_template_id",
            )?,
            delete_account: require(
                file.delete_account_template_id
                    .or_else(|| cli.sendgrid_delete_account_template_id.clone()),
                "delete_account_template_id",
            )?,
        },
    }))
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
