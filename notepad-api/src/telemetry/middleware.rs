//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a tracing span, records Prometheus metrics and
//! logs completion.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::with_metrics;

/// Label for any path outside the known routes.
pub const UNMATCHED_ROUTE: &str = "/{unmatched}";

/// Normalize path for metrics/spans.
///
/// Short codes become `{code}` and every path that matches no route shares
/// [`UNMATCHED_ROUTE`], so the label set stays fixed whatever clients send.
pub fn normalize_path(path: &str) -> &'static str {
    let trimmed = path.trim_matches('/');
    let segments: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    };

    match segments.as_slice() {
        ["notes"] => "/notes",
        ["notes", _code] => "/notes/{code}",
        ["notes", _code, "ownership"] => "/notes/{code}/ownership",
        ["verify"] => "/verify",
        ["check", _code] => "/check/{code}",
        ["health", "ping"] => "/health/ping",
        ["health", "live"] => "/health/live",
        ["health", "ready"] => "/health/ready",
        ["metrics"] => "/metrics",
        ["openapi.json"] => "/openapi.json",
        ["swagger-ui", ..] => "/swagger-ui",
        _ => UNMATCHED_ROUTE,
    }
}

/// Observability middleware for Axum.
///
/// This middleware wraps every request with:
/// 1. A tracing span carrying method and normalized route
/// 2. Prometheus metrics recording
/// 3. Request/response logging
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let normalized_path = normalize_path(request.uri().path());

    // The raw path carries short codes, which are note capabilities, so only
    // the normalized route is recorded.
    let tracing_span = info_span!(
        "http_request",
        http.method = %method,
        http.route = %normalized_path,
    );

    let response = next.run(request).instrument(tracing_span).await;

    let duration = start.elapsed();
    let status = response.status();

    with_metrics(|m| {
        m.record_http_request(
            method.as_str(),
            normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        )
    });

    tracing::info!(
        method = %method,
        path = %normalized_path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
