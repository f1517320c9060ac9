#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use notepad_api::{
    create_api_router, ApiConfig, LocalRateLimiter, NoteService, OwnerTokenIssuer,
    PasswordConfig, PasswordGuard, RateLimitPolicy, RateLimiter,
};
use notepad_core::NoteLimits;
use notepad_storage::InMemoryNoteStore;
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

pub const TEST_BASE_URL: &str = "https://notepad.test";
pub const TEST_OWNER_SECRET: &str = "integration-test-secret";

/// A router over a fresh in-memory store, plus a handle to that store.
pub struct TestApp {
    pub router: Router,
    pub store: InMemoryNoteStore,
}

impl TestApp {
    /// Rate limits high enough that ordinary tests never hit them.
    pub fn new() -> Self {
        Self::with_limits(NoteLimits::default(), policy(1_000, 1_000))
    }

    pub fn with_rate_limits(general: u32, verify: u32) -> Self {
        Self::with_limits(NoteLimits::default(), policy(general, verify))
    }

    pub fn with_limits(limits: NoteLimits, policy: RateLimitPolicy) -> Self {
        let store = InMemoryNoteStore::new();
        let limiter: Arc<dyn RateLimiter> = Arc::new(LocalRateLimiter::new(policy));
        let guard = PasswordGuard::new(&PasswordConfig::for_testing())
            .expect("test password config is valid");
        let tokens = OwnerTokenIssuer::new(TEST_OWNER_SECRET).expect("secret is non-empty");
        let service = NoteService::new(Arc::new(store.clone()), guard, tokens, limits, TEST_BASE_URL);

        let router = create_api_router(service, limiter, &ApiConfig::default())
            .expect("development config is valid");

        Self { router, store }
    }

    /// Send a request and return status, headers and parsed JSON body.
    ///
    /// Non-JSON bodies are returned as a JSON string.
    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse, String> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| format!("request failed: {}", e))?;
        TestResponse::read(response).await
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse, String> {
        self.send(request("GET", uri, None)?).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Result<TestResponse, String> {
        self.send(request("POST", uri, Some(body))?).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Result<TestResponse, String> {
        self.send(request("PATCH", uri, Some(body))?).await
    }
}

pub struct TestResponse {
    pub status: u16,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    async fn read(response: Response<Body>) -> Result<Self, String> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| format!("failed to read body: {}", e))?;
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// The `error` field of an error body.
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub fn policy(general: u32, verify: u32) -> RateLimitPolicy {
    RateLimitPolicy {
        general_per_window: general,
        verify_per_window: verify,
        burst: general.max(verify),
        window: Duration::from_secs(60),
    }
}

pub fn request(method: &str, uri: &str, body: Option<Value>) -> Result<Request<Body>, String> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.map_err(|e| e.to_string())
}
