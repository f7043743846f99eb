pub mod config;
mod error_response;
mod extract;
mod http_layers;
pub mod metrics;
mod playlist_routes;
pub mod server;
pub(self) mod session;
pub mod state;
mod track_routes;
mod user_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use session::{COOKIE_SESSION_TOKEN_KEY, HEADER_SESSION_TOKEN_KEY};
