use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use musicverse_server::catalog_store::{CatalogStore, SqliteCatalogStore};
use musicverse_server::config::{AppConfig, CliConfig, FileConfig};
use musicverse_server::email::{EmailSender, LogEmailSender, SendGridEmailSender};
use musicverse_server::library::{PlaylistManager, TrackManager};
use musicverse_server::media::{FsMediaStore, MediaStore};
use musicverse_server::metadata::{LastFmClient, NoOpMetadataProvider, TrackMetadataProvider};
use musicverse_server::server::{self, run_server, RequestsLoggingLevel, ServerConfig};
use musicverse_server::user::{CredentialHasher, SqliteUserStore, TokenIssuer, UserManager, UserStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding user.db and catalog.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory for audio files, covers and avatars. Defaults to <db-dir>/media.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Public base URL of this server, media links are built on it.
    #[clap(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Base URL of the web client, used in emailed links.
    #[clap(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    /// Secret signing session and confirmation tokens.
    #[clap(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Last.fm API key for track metadata. Uploads are not enriched without it.
    #[clap(long, env = "LASTFM_API_KEY", hide_env_values = true)]
    pub lastfm_api_key: Option<String>,

    /// SendGrid API key. Emails are only logged without it.
    #[clap(long, env = "SENDGRID_API_KEY", hide_env_values = true)]
    pub sendgrid_api_key: Option<String>,

    #[clap(long, env = "SENDGRID_FROM_EMAIL")]
    pub sendgrid_from_email: Option<String>,

    #[clap(long, env = "SENDGRID_REGISTRATION_TEMPLATE_ID")]
    pub sendgrid_registration_template_id: Option<String>,

    #[clap(long, env = "SENDGRID_PASSWORD_RECOVERY_TEMPLATE_ID")]
    pub sendgrid_password_recovery_template_id: Option<String>,

    #[clap(long, env = "SENDGRID_EMAIL_CHANGE_TEMPLATE_ID")]
    pub sendgrid_email_change_template_id: Option<String>,

    #[clap(long, env = "SENDGRID_DELETE_ACCOUNT_TEMPLATE_ID")]
    pub sendgrid_delete_account_template_id: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            media_path: self.media_path.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            public_url: self.public_url.clone(),
            frontend_url: self.frontend_url.clone(),
            jwt_secret: self.jwt_secret.clone(),
            lastfm_api_key: self.lastfm_api_key.clone(),
            sendgrid_api_key: self.sendgrid_api_key.clone(),
            sendgrid_from_email: self.sendgrid_from_email.clone(),
            sendgrid_registration_template_id: self.sendgrid_registration_template_id.clone(),
            sendgrid_password_recovery_template_id: self
                .sendgrid_password_recovery_template_id
                .clone(),
            sendgrid_email_change_template_id: self.sendgrid_email_change_template_id.clone(),
            sendgrid_delete_account_template_id: self.sendgrid_delete_account_template_id.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening SQLite catalog database at {:?}...", config.catalog_db_path());
    let catalog_store = Arc::new(SqliteCatalogStore::new(config.catalog_db_path())?);

    info!("Initializing metrics...");
    server::metrics::init_metrics();
    server::metrics::init_catalog_metrics(
        catalog_store.count_tracks()?,
        catalog_store.count_playlists()?,
    );

    info!("Opening SQLite user database at {:?}...", config.user_db_path());
    let user_store: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(config.user_db_path())?);
    let catalog_store: Arc<dyn CatalogStore> = catalog_store;

    info!("Serving media from {:?}", config.media_path);
    let media_store: Arc<dyn MediaStore> =
        Arc::new(FsMediaStore::new(&config.media_path, &config.public_url)?);

    let email_sender: Arc<dyn EmailSender> = match &config.sendgrid {
        Some(settings) => {
            info!("Sending emails through SendGrid as {}", settings.from_email);
            Arc::new(SendGridEmailSender::new(settings)?)
        }
        None => {
            info!("No SendGrid key configured, emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    let metadata_provider: Arc<dyn TrackMetadataProvider> = match &config.lastfm_api_key {
        Some(key) => Arc::new(LastFmClient::new(key)?),
        None => {
            info!("No Last.fm key configured, uploads will not be enriched");
            Arc::new(NoOpMetadataProvider)
        }
    };

    let user_manager = Arc::new(UserManager::new(
        user_store.clone(),
        catalog_store.clone(),
        media_store.clone(),
        email_sender,
        TokenIssuer::new(&config.jwt_secret),
        CredentialHasher::default(),
        &config.frontend_url,
    ));
    let track_manager = Arc::new(TrackManager::new(
        user_store.clone(),
        catalog_store.clone(),
        media_store.clone(),
        metadata_provider,
    ));
    let playlist_manager = Arc::new(PlaylistManager::new(user_store, catalog_store, media_store));

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        metrics_port: config.metrics_port,
        media_dir: config.media_path.clone(),
        ..Default::default()
    };

    run_server(server_config, user_manager, track_manager, playlist_manager).await
}
