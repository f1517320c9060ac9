//! Request Rate Limiting
//!
//! The limiter is injected into the router as a trait object, so the same
//! middleware can count locally (per process) or centrally (PostgreSQL).
//! Backends are keyed by client IP and a scope; password attempts get their
//! own, tighter scope.

mod local;
mod postgres;

pub use local::LocalRateLimiter;
pub use postgres::{sliding_window_estimate, sliding_window_retry_after, PgRateLimiter};

use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::ApiConfig;

/// Which budget a request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitScope {
    /// Every non-health request.
    General,
    /// Requests that check a password.
    Verify,
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::General => "general",
            RateLimitScope::Verify => "verify",
        }
    }
}

/// Identity of a rate limit bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub scope: RateLimitScope,
    pub ip: IpAddr,
}

impl RateLimitKey {
    pub fn new(scope: RateLimitScope, ip: IpAddr) -> Self {
        Self { scope, ip }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope.as_str(), self.ip)
    }
}

/// Answer for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { limit: u32 },
    Limited { retry_after_secs: u64 },
}

/// Limiter backend failures. The middleware fails open on these.
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("Rate limiter backend failure: {0}")]
    Backend(String),
}

/// Per-scope quotas shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub general_per_window: u32,
    pub verify_per_window: u32,
    pub burst: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}

impl RateLimitPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            general_per_window: config.rate_limit_per_minute,
            verify_per_window: config.rate_limit_verify_per_minute,
            burst: config.rate_limit_burst,
            window: config.rate_limit_window,
        }
    }

    /// Requests allowed per window for a scope. Never zero.
    pub fn limit_for(&self, scope: RateLimitScope) -> u32 {
        let limit = match scope {
            RateLimitScope::General => self.general_per_window,
            RateLimitScope::Verify => self.verify_per_window,
        };
        limit.max(1)
    }

    /// Burst for a scope, capped at the scope's limit.
    pub fn burst_for(&self, scope: RateLimitScope) -> u32 {
        self.burst.max(1).min(self.limit_for(scope))
    }

    /// Window length in whole seconds. Never zero.
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

/// A rate limit backend.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request against `key` and decide.
    async fn check(&self, key: &RateLimitKey) -> Result<RateDecision, LimiterError>;

    /// Drop state that can no longer affect a decision. Returns how many
    /// entries were removed.
    async fn sweep(&self) -> Result<u64, LimiterError>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Background task periodically calling [`RateLimiter::sweep`].
///
/// The task is aborted when the handle is shut down or dropped.
#[derive(Debug)]
pub struct SweeperHandle {
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start sweeping `limiter` every `interval`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_sweeper(limiter: Arc<dyn RateLimiter>, interval: Duration) -> SweeperHandle {
    let interval = interval.max(Duration::from_secs(1));
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; there is nothing to sweep yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match limiter.sweep().await {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::debug!(backend = limiter.backend_name(), removed, "Rate limiter swept")
                }
                Err(e) => tracing::warn!(
                    backend = limiter.backend_name(),
                    error = %e,
                    "Rate limiter sweep failed"
                ),
            }
        }
    });
    SweeperHandle { task: Some(task) }
}
