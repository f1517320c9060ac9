//! Notepad API - REST Layer for the Cloud Notepad
//!
//! Short-code notes with optional password protection, served over Axum.
//! Notes live behind the [`NoteStore`](notepad_storage::NoteStore) seam:
//! PostgreSQL in production, in memory for tests and local runs.
//!
//! Requests pass through CORS, observability and rate limiting before
//! reaching the handlers, which delegate to [`NoteService`].

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod limiter;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{
    note_limits_from_env, ApiConfig, Environment, PasswordConfig, RateLimitBackend, StoreKind,
};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use limiter::{
    spawn_sweeper, LocalRateLimiter, PgRateLimiter, RateLimitPolicy, RateLimiter, SweeperHandle,
};
pub use openapi::ApiDoc;
pub use routes::{create_api_router, RouterBuilder};
pub use services::{NoteService, OwnerTokenIssuer, PasswordGuard, ShortCodeAllocator, VerifyOutcome};
pub use types::*;
