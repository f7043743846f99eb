use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all Musicverse metrics
const PREFIX: &str = "musicverse";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Authentication Metrics
    pub static ref AUTH_LOGIN_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_auth_login_attempts_total"), "Total login attempts"),
        &["status"]
    ).expect("Failed to create auth_login_attempts_total metric");

    pub static ref AUTH_LOGIN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_auth_login_duration_seconds"),
            "Login request duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0])
    ).expect("Failed to create auth_login_duration_seconds metric");

    pub static ref ACCOUNT_EVENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_account_events_total"), "Account lifecycle events"),
        &["event"]
    ).expect("Failed to create account_events_total metric");

    // Upload Metrics
    pub static ref UPLOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_uploads_total"), "Media uploads by kind and outcome"),
        &["kind", "status"]
    ).expect("Failed to create uploads_total metric");

    pub static ref UPLOAD_BYTES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_upload_bytes_total"), "Bytes of accepted uploads"),
        &["kind"]
    ).expect("Failed to create upload_bytes_total metric");

    // Catalog Metrics
    pub static ref CATALOG_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_catalog_items_total"), "Total items in catalog"),
        &["type"]
    ).expect("Failed to create catalog_items_total metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total error responses by kind"),
        &["error_type"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Already registered is fine, tests call this repeatedly.
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ACCOUNT_EVENTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(UPLOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(UPLOAD_BYTES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_ITEMS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn init_catalog_metrics(num_tracks: usize, num_playlists: usize) {
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["track"])
        .set(num_tracks as f64);
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["playlist"])
        .set(num_playlists as f64);

    tracing::info!(
        "Catalog metrics initialized: {} tracks, {} playlists",
        num_tracks,
        num_playlists
    );
}

/// Collapses ids, tokens and blob names so every route has one label.
pub fn route_label(path: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut placeholder_next = false;
    for segment in path.split('/') {
        if placeholder_next && !segment.is_empty() {
            segments.push("{param}".to_string());
            placeholder_next = false;
            continue;
        }
        placeholder_next = matches!(
            segment,
            "verify-account" | "confirm-new-email" | "media" | "get-playlist-details" | "update"
        ) || (segment == "delete" && path.starts_with("/v1/playlists"));
        if crate::catalog_store::is_valid_resource_id(segment) {
            segments.push("{id}".to_string());
        } else {
            segments.push(segment.to_string());
        }
    }
    segments.join("/")
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_login_attempt(status: &str, duration: Duration) {
    AUTH_LOGIN_ATTEMPTS_TOTAL.with_label_values(&[status]).inc();
    AUTH_LOGIN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// `event` is one of registered, verified, password_reset, email_changed, deleted.
pub fn record_account_event(event: &str) {
    ACCOUNT_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

pub fn record_upload(kind: &str, succeeded: bool, bytes: usize) {
    let status = if succeeded { "success" } else { "failure" };
    UPLOADS_TOTAL.with_label_values(&[kind, status]).inc();
    if succeeded {
        UPLOAD_BYTES_TOTAL
            .with_label_values(&[kind])
            .inc_by(bytes as f64);
    }
}

pub fn adjust_catalog_items(item_type: &str, delta: f64) {
    CATALOG_ITEMS_TOTAL.with_label_values(&[item_type]).add(delta);
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // Reported in kB
                    if let Some(kb) = line
                        .split_whitespace()
                        .nth(1)
                        .and_then(|s| s.parse::<f64>().ok())
                    {
                        PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                        return;
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
