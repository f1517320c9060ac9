//! Notepad API Server Entry Point
//!
//! Bootstraps configuration, selects the note store and rate limiter
//! backends, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use notepad_api::telemetry::{init_tracing, TelemetryConfig};
use notepad_api::{
    create_api_router, note_limits_from_env, spawn_sweeper, ApiConfig, ApiError, ApiResult,
    DbClient, DbConfig, LocalRateLimiter, NoteService, OwnerTokenIssuer, PasswordConfig,
    PasswordGuard, PgRateLimiter, RateLimitBackend, RateLimitPolicy, RateLimiter, StoreKind,
};
use notepad_storage::{InMemoryNoteStore, NoteStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let store_kind = StoreKind::from_env();

    let db = match store_kind {
        StoreKind::Postgres => {
            let db = DbClient::from_config(&DbConfig::from_env())?;
            db.ensure_schema().await?;
            Some(db)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory note store; notes are lost on restart");
            None
        }
    };

    let store: Arc<dyn NoteStore> = match &db {
        Some(db) => Arc::new(db.clone()),
        None => Arc::new(InMemoryNoteStore::new()),
    };

    let policy = RateLimitPolicy::from_config(&api_config);
    let limiter: Arc<dyn RateLimiter> = match (api_config.rate_limit_backend, &db) {
        (RateLimitBackend::Postgres, Some(db)) => Arc::new(PgRateLimiter::new(db.pool().clone(), policy)),
        (RateLimitBackend::Postgres, None) => {
            return Err(ApiError::invalid_input(
                "NOTEPAD_RATE_LIMIT_BACKEND=postgres requires NOTEPAD_STORE=postgres",
            ));
        }
        (RateLimitBackend::Local, _) => Arc::new(LocalRateLimiter::new(policy)),
    };
    let sweeper = spawn_sweeper(limiter.clone(), api_config.rate_limit_sweep_interval);

    let guard = PasswordGuard::new(&PasswordConfig::from_env())?;
    let service = NoteService::new(
        store,
        guard,
        OwnerTokenIssuer::from_env(),
        note_limits_from_env(),
        api_config.public_base_url.clone(),
    );

    let app: Router = create_api_router(service, limiter.clone(), &api_config)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(
        %addr,
        service = %telemetry_config.service_name,
        version = %telemetry_config.service_version,
        store = ?store_kind,
        rate_limiter = limiter.backend_name(),
        "Starting Notepad API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    sweeper.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("NOTEPAD_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("NOTEPAD_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str.parse::<u16>().map_err(|_| {
        ApiError::invalid_input(format!("Invalid port value: {}", port_str))
    })?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
    })
}
