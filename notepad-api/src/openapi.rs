//! OpenAPI Specification for the Notepad API
//!
//! Generated by utoipa from the route annotations and request/response types.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{HealthReport, HealthStatus};
use crate::types::*;

// Import route modules for path references
use crate::routes::{check, health, note, verify};
use crate::telemetry::metrics;

/// OpenAPI document for the Notepad API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Notepad API",
        version = "0.1.0",
        description = "Cloud notepad: short-code notes with optional password protection",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Notes", description = "Create, read and update notes by short code"),
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        // === Note Routes ===
        note::create_note,
        note::get_note,
        note::update_note,
        note::check_ownership,
        verify::verify_password,
        check::check_availability,

        // === Health Routes ===
        health::ping,
        health::liveness,
        health::readiness,

        // === Observability ===
        metrics::metrics_handler,
    ),
    components(
        schemas(
            // === Note Types ===
            CreateNoteRequest, CreateNoteResponse, UpdateNoteRequest, NoteResponse,
            OwnershipResponse, VerifyPasswordRequest, VerifyPasswordResponse,
            AvailabilityResponse,

            // === Health Types ===
            HealthReport, HealthStatus,

            // === Error Types ===
            ApiError, ErrorCode,
        )
    ),
    modifiers(&OwnerTokenAddon)
)]
pub struct ApiDoc;

/// Documents the owner token header returned on note creation.
struct OwnerTokenAddon;

impl Modify for OwnerTokenAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "owner_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Owner-Token"))),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        let openapi = Self::openapi();
        serde_json::to_string_pretty(&openapi)
    }
}
