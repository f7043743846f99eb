use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::info;

use super::metrics::metrics_handler;
use super::playlist_routes::make_playlist_routes;
use super::session::Session;
use super::state::*;
use super::track_routes::make_track_routes;
use super::user_routes::make_user_routes;
use super::{log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    #[serde(rename = "loggedUser", skip_serializing_if = "Option::is_none")]
    pub logged_user: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        logged_user: session.map(|s| s.user.username),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    user_manager: GuardedUserManager,
    track_manager: GuardedTrackManager,
    playlist_manager: GuardedPlaylistManager,
) -> Result<Router> {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        hash: env!("GIT_HASH").to_string(),
        user_manager,
        track_manager,
        playlist_manager,
    };

    let media_service = ServeDir::new(&config.media_dir);

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let app: Router = home_router
        .nest("/v1/users", make_user_routes(state.clone()))
        .nest("/v1/tracks", make_track_routes(state.clone()))
        .nest("/v1/playlists", make_playlist_routes(state.clone()))
        .nest_service("/v1/media", media_service)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the API and, on its own port, the metrics endpoint. Returns when
/// either of them stops.
pub async fn run_server(
    config: ServerConfig,
    user_manager: GuardedUserManager,
    track_manager: GuardedTrackManager,
    playlist_manager: GuardedPlaylistManager,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, user_manager, track_manager, playlist_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    tokio::try_join!(
        async { axum::serve(listener, app).await.context("API server failed") },
        async {
            axum::serve(metrics_listener, make_metrics_app())
                .await
                .context("Metrics server failed")
        },
    )?;
    Ok(())
}
