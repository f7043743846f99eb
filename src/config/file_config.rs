use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_dir: Option<String>,
    pub media_path: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub public_url: Option<String>,
    pub frontend_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub lastfm_api_key: Option<String>,

    pub sendgrid: Option<SendGridConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SendGridConfig {
    pub api_key: Option<String>,
    pub from_email: Option<String>,
    pub registration_template_id: Option<String>,
    pub password_recovery_template_id: Option<String>,
    pub email_change_template_id: Option<String>,
    pub delete_account_template_id: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
