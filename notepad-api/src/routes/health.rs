//! Liveness and readiness checks.
//!
//! `/health/ready` round-trips the note store; the other two never touch it.
//! None of these routes are rate limited.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

use crate::services::NoteService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health answer. Store fields are only present on readiness.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

#[derive(Clone)]
pub struct HealthState {
    service: Arc<NoteService>,
    started: Instant,
}

impl HealthState {
    fn report(&self, status: HealthStatus) -> HealthReport {
        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started.elapsed().as_secs(),
            store_latency_ms: None,
            store_error: None,
        }
    }
}

#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses((status = 200, description = "Service is responding", body = String)),
)]
pub async fn ping() -> &'static str {
    "pong"
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is alive", body = HealthReport)),
)]
pub async fn liveness(State(state): State<HealthState>) -> Json<HealthReport> {
    Json(state.report(HealthStatus::Up))
}

/// Ready when a store round-trip succeeds.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Store reachable", body = HealthReport),
        (status = 503, description = "Store unreachable", body = HealthReport),
    ),
)]
pub async fn readiness(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let start = Instant::now();
    let report = match state.service.health_check().await {
        Ok(()) => HealthReport {
            store_latency_ms: Some(start.elapsed().as_millis() as u64),
            ..state.report(HealthStatus::Up)
        },
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            HealthReport {
                store_error: Some(e.message),
                ..state.report(HealthStatus::Down)
            }
        }
    };
    (report.status.status_code(), Json(report))
}

pub fn create_router(service: Arc<NoteService>) -> Router {
    let state = HealthState {
        service,
        started: Instant::now(),
    };

    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}
