//! Rate limiting middleware.
//!
//! Applies the injected [`RateLimiter`] to every route except `/health/*`.
//! When rate limited, returns 429 Too Many Requests with a Retry-After
//! header. Limiter backend failures let the request through.
//!
//! Clients are keyed by socket address. Forwarding headers are only honored
//! when the deployment says a trusted proxy sets them.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderName, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::error::ApiError;
use crate::limiter::{RateDecision, RateLimitKey, RateLimitScope, RateLimiter};
use crate::telemetry::metrics::with_metrics;

/// State for rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<dyn RateLimiter>,
    enabled: bool,
    trust_proxy_headers: bool,
}

impl RateLimitState {
    pub fn new(limiter: Arc<dyn RateLimiter>, enabled: bool, trust_proxy_headers: bool) -> Self {
        Self {
            limiter,
            enabled,
            trust_proxy_headers,
        }
    }
}

/// Error type for rate limit middleware.
struct RateLimitError {
    /// Seconds until the client may retry
    retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut response = ApiError::too_many_requests(Some(self.retry_after)).into_response();
        response.headers_mut().insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Extract the client IP.
///
/// With `trust_proxy_headers` the order is first `X-Forwarded-For` hop,
/// `X-Real-IP`, then the socket address. Without it the headers are ignored,
/// since any caller can forge them.
pub fn client_ip(
    headers: &HeaderMap,
    socket: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> IpAddr {
    let socket_ip = socket
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    if !trust_proxy_headers {
        return socket_ip;
    }

    // X-Forwarded-For can contain multiple IPs, take the first one
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
    {
        return ip;
    }

    socket_ip
}

/// Which budget a request draws from, or `None` for exempt routes.
///
/// Password attempts (`POST /verify` and note updates) share the tighter
/// verify budget.
pub fn scope_for(method: &Method, path: &str) -> Option<RateLimitScope> {
    if path == "/health" || path.starts_with("/health/") {
        return None;
    }
    let is_password_attempt = (method == Method::POST && path.trim_end_matches('/') == "/verify")
        || (method == Method::PATCH && path.starts_with("/notes/"));
    if is_password_attempt {
        Some(RateLimitScope::Verify)
    } else {
        Some(RateLimitScope::General)
    }
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(request).await;
    }

    let Some(scope) = scope_for(request.method(), request.uri().path()) else {
        return next.run(request).await;
    };

    let socket = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), socket, state.trust_proxy_headers);
    let key = RateLimitKey::new(scope, ip);

    match state.limiter.check(&key).await {
        Ok(RateDecision::Allowed { limit }) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(limit),
            );
            response
        }
        Ok(RateDecision::Limited { retry_after_secs }) => {
            with_metrics(|m| m.record_rate_limited(scope.as_str()));
            tracing::warn!(
                scope = scope.as_str(),
                client_ip = %key.ip,
                retry_after_secs,
                "Rate limit exceeded"
            );
            RateLimitError {
                retry_after: retry_after_secs,
            }
            .into_response()
        }
        Err(e) => {
            tracing::error!(
                backend = state.limiter.backend_name(),
                error = %e,
                "Rate limiter unavailable, allowing request"
            );
            next.run(request).await
        }
    }
}
