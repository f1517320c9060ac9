//! Axum middleware.

mod rate_limit;

pub use rate_limit::{client_ip, rate_limit_middleware, scope_for, RateLimitState};
