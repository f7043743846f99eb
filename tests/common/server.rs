//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases and media dir.

use super::constants::*;
use super::fixtures::{seed_verified_user, StubMetadataProvider};
use musicverse_server::catalog_store::{CatalogStore, SqliteCatalogStore};
use musicverse_server::email::RecordingEmailSender;
use musicverse_server::library::{PlaylistManager, TrackManager};
use musicverse_server::media::{FsMediaStore, MediaStore};
use musicverse_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use musicverse_server::user::{
    CredentialHasher, SqliteUserStore, TokenIssuer, UserManager, UserStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated stores
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Every email the server sent, in order
    pub emails: Arc<RecordingEmailSender>,

    /// Direct store access for assertions
    pub user_store: Arc<dyn UserStore>,
    pub catalog_store: Arc<dyn CatalogStore>,

    pub media_dir: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port, with [`TEST_USER`] and
    /// [`OTHER_USER`] registered and verified.
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let media_dir = temp_dir.path().join("media");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let user_store: Arc<dyn UserStore> = Arc::new(
            SqliteUserStore::new(temp_dir.path().join("user.db"))
                .expect("Failed to open user store"),
        );
        let catalog_store: Arc<dyn CatalogStore> = Arc::new(
            SqliteCatalogStore::new(temp_dir.path().join("catalog.db"))
                .expect("Failed to open catalog store"),
        );
        let media_store: Arc<dyn MediaStore> = Arc::new(
            FsMediaStore::new(&media_dir, &base_url).expect("Failed to create media store"),
        );
        let emails = Arc::new(RecordingEmailSender::default());

        let user_manager = Arc::new(UserManager::new(
            user_store.clone(),
            catalog_store.clone(),
            media_store.clone(),
            emails.clone(),
            TokenIssuer::new(TEST_JWT_SECRET),
            CredentialHasher::with_cost(8, 1, 1).expect("Invalid hasher cost"),
            FRONTEND_URL,
        ));
        let track_manager = Arc::new(TrackManager::new(
            user_store.clone(),
            catalog_store.clone(),
            media_store.clone(),
            Arc::new(StubMetadataProvider),
        ));
        let playlist_manager = Arc::new(PlaylistManager::new(
            user_store.clone(),
            catalog_store.clone(),
            media_store,
        ));

        seed_verified_user(&user_manager, &emails, TEST_USER, TEST_EMAIL, TEST_PASS).await;
        seed_verified_user(&user_manager, &emails, OTHER_USER, OTHER_EMAIL, OTHER_PASS).await;

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            media_dir: media_dir.clone(),
            ..Default::default()
        };
        let app = make_app(config, user_manager, track_manager, playlist_manager)
            .expect("Failed to build app");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            emails,
            user_store,
            catalog_store,
            media_dir,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }

    /// Link of the most recent email of `template` sent to `to`.
    #[allow(dead_code)]
    pub fn last_email_link(
        &self,
        to: &str,
        template: musicverse_server::email::EmailTemplate,
    ) -> Option<String> {
        self.emails
            .last_to(to, template)
            .and_then(|m| m.data["link"].as_str().map(str::to_string))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
