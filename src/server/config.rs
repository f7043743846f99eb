use super::RequestsLoggingLevel;
use std::path::PathBuf;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Prometheus scraping port, served apart from the API.
    pub metrics_port: u16,
    /// Directory served under `/v1/media`.
    pub media_dir: PathBuf,
    /// Upper bound for request bodies, multipart uploads included.
    pub max_body_bytes: usize,
}

/// Largest accepted upload (12 MiB) plus room for the other multipart fields.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            metrics_port: 9091,
            media_dir: PathBuf::from("media"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
