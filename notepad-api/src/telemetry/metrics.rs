//! Prometheus Metrics Definitions
//!
//! Defines all notepad metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<NotepadMetrics>> = Lazy::new(NotepadMetrics::new);

/// Container for all notepad metrics.
#[derive(Clone)]
pub struct NotepadMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Notes created - labels: protected (true/false), code (generated/custom)
    pub notes_created_total: CounterVec,

    /// Password checks - labels: result (valid/invalid)
    pub password_verifications_total: CounterVec,

    /// Rejected requests - labels: scope
    pub rate_limited_total: CounterVec,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl NotepadMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "notepad_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "notepad_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            notes_created_total: register_counter_vec!(
                "notepad_notes_created_total",
                "Total notes created",
                &["protected", "code"]
            )
            .map_err(|e| registration_error("notes_created_total", e))?,

            password_verifications_total: register_counter_vec!(
                "notepad_password_verifications_total",
                "Total password verification attempts",
                &["result"]
            )
            .map_err(|e| registration_error("password_verifications_total", e))?,

            rate_limited_total: register_counter_vec!(
                "notepad_rate_limited_total",
                "Total requests rejected by the rate limiter",
                &["scope"]
            )
            .map_err(|e| registration_error("rate_limited_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_note_created(&self, protected: bool, custom_code: bool) {
        let protected = if protected { "true" } else { "false" };
        let code = if custom_code { "custom" } else { "generated" };
        self.notes_created_total
            .with_label_values(&[protected, code])
            .inc();
    }

    pub fn record_password_verification(&self, valid: bool) {
        let result = if valid { "valid" } else { "invalid" };
        self.password_verifications_total
            .with_label_values(&[result])
            .inc();
    }

    pub fn record_rate_limited(&self, scope: &str) {
        self.rate_limited_total.with_label_values(&[scope]).inc();
    }
}

/// Run `f` against the global metrics if they registered.
pub fn with_metrics(f: impl FnOnce(&NotepadMetrics)) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Make sure our collectors exist even before the first request lands.
    Lazy::force(&METRICS);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
