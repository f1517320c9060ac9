//! REST API Routes Module
//!
//! This module contains all REST API route handlers organized by resource.
//!
//! Includes:
//! - Note routes (create, fetch, update, ownership)
//! - Password verification and short code availability
//! - Health check endpoints (Kubernetes-compatible)
//! - CORS support for the browser client

pub mod check;
pub mod health;
pub mod note;
pub mod verify;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::limiter::RateLimiter;
use crate::middleware::{rate_limit_middleware, RateLimitState};
use crate::openapi::ApiDoc;
use crate::services::NoteService;

// Re-export route creation functions for convenience
pub use check::create_router as check_router;
pub use health::create_router as health_router;
pub use note::create_router as note_router;
pub use verify::create_router as verify_router;

/// Room for JSON escaping and the other request fields on top of the
/// content byte limit.
const BODY_LIMIT_OVERHEAD: usize = 64 * 1024;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// ROUTER BUILDER
// ============================================================================

/// Builder for the notepad router.
///
/// Every route is wrapped, outer to inner, by:
/// 1. CORS layer
/// 2. Observability middleware
/// 3. Rate limiting middleware
///
/// Health routes are exempt from rate limiting.
pub struct RouterBuilder {
    service: Arc<NoteService>,
    api_config: ApiConfig,
    rate_limit_state: RateLimitState,
}

impl RouterBuilder {
    /// Create a new RouterBuilder.
    pub fn new(service: NoteService, limiter: Arc<dyn RateLimiter>, api_config: ApiConfig) -> Self {
        let rate_limit_state = RateLimitState::new(
            limiter,
            api_config.rate_limit_enabled,
            api_config.trust_proxy_headers,
        );

        Self {
            service: Arc::new(service),
            api_config,
            rate_limit_state,
        }
    }

    /// Largest accepted request body.
    fn body_limit(&self) -> usize {
        self.service
            .limits()
            .content
            .max_bytes
            .saturating_mul(6)
            .saturating_add(BODY_LIMIT_OVERHEAD)
    }

    /// Build the complete router.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS (outermost) - handles preflight requests
    /// 2. Observability - tracing and metrics
    /// 3. Rate Limiting - rejects floods before password hashing
    pub fn build(self) -> Router {
        use crate::telemetry::{metrics_handler, observability_middleware};
        use axum::middleware::from_fn;

        let body_limit = self.body_limit();

        #[allow(unused_mut)]
        let mut router = Router::new()
            .nest("/notes", note::create_router(self.service.clone()))
            .nest("/verify", verify::create_router(self.service.clone()))
            .nest("/check", check::create_router(self.service.clone()))
            .nest("/health", health::create_router(self.service.clone()))
            // Metrics endpoint (rate-limited like everything else)
            .route("/metrics", get(metrics_handler))
            // OpenAPI spec
            .route("/openapi.json", get(openapi_json));

        // Add Swagger UI if swagger-ui feature is enabled
        #[cfg(feature = "swagger-ui")]
        {
            use utoipa_swagger_ui::SwaggerUi;
            router = router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()));
        }

        let cors = build_cors_layer(&self.api_config);

        // Execution order: CORS -> Observability -> Rate Limiting -> Handler
        router
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(from_fn_with_state(self.rate_limit_state, rate_limit_middleware))
            .layer(from_fn(observability_middleware))
            .layer(cors)
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// With no configured origins every origin is allowed. Configured origins
/// may use a `*.` prefix to allow subdomains over HTTPS.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(note::OWNER_TOKEN_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("retry-after"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: allowing origins: {:?}",
            config.cors_origins
        );
        let allowed = config.clone();
        let origins = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|o| allowed.is_origin_allowed(o))
                .unwrap_or(false)
        });

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router.
///
/// Routes:
/// - `/notes`, `/notes/:code`, `/notes/:code/ownership`
/// - `/verify`
/// - `/check/:code`
/// - `/health/*` (not rate limited)
/// - `/metrics` and `/openapi.json`
/// - `/swagger-ui` (when the swagger-ui feature is enabled)
///
/// In production, refuses configurations that are unsafe to serve.
pub fn create_api_router(
    service: NoteService,
    limiter: Arc<dyn RateLimiter>,
    api_config: &ApiConfig,
) -> ApiResult<Router> {
    api_config.validate_for_production(service.owner_tokens().is_configured())?;
    if api_config.is_production() && !api_config.rate_limit_enabled {
        tracing::warn!("Rate limiting is disabled in production");
    }

    Ok(RouterBuilder::new(service, limiter, api_config.clone()).build())
}
