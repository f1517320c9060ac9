//! Note REST API Routes
//!
//! This module implements Axum route handlers for note operations.
//! All handlers delegate to the [`NoteService`].

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    extractors::ValidatedJson,
    services::NoteService,
    types::{
        CreateNoteRequest, CreateNoteResponse, NoteResponse, OwnershipResponse, UpdateNoteRequest,
    },
};

/// Header carrying the owner token on ownership checks.
pub const OWNER_TOKEN_HEADER: &str = "x-owner-token";

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /notes - Create a new note
#[utoipa::path(
    post,
    path = "/notes",
    tag = "Notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = CreateNoteResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 409, description = "Custom short code already in use", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
        (status = 500, description = "No free short code could be allocated", body = ApiError),
    ),
)]
pub async fn create_note(
    State(service): State<Arc<NoteService>>,
    ValidatedJson(req): ValidatedJson<CreateNoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = service.create(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /notes/{code} - Get a note by short code
#[utoipa::path(
    get,
    path = "/notes/{code}",
    tag = "Notes",
    params(
        ("code" = String, Path, description = "Note short code")
    ),
    responses(
        (status = 200, description = "Note details; content is empty when password protected", body = NoteResponse),
        (status = 404, description = "Note not found", body = ApiError),
    ),
)]
pub async fn get_note(
    State(service): State<Arc<NoteService>>,
    Path(code): Path<String>,
) -> ApiResult<Json<NoteResponse>> {
    let note = service.fetch(&code).await?;
    Ok(Json(note))
}

/// PATCH /notes/{code} - Update a note
#[utoipa::path(
    patch,
    path = "/notes/{code}",
    tag = "Notes",
    params(
        ("code" = String, Path, description = "Note short code")
    ),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated successfully", body = NoteResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Password missing or incorrect", body = ApiError),
        (status = 404, description = "Note not found", body = ApiError),
        (status = 409, description = "New short code already in use", body = ApiError),
    ),
)]
pub async fn update_note(
    State(service): State<Arc<NoteService>>,
    Path(code): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateNoteRequest>,
) -> ApiResult<Json<NoteResponse>> {
    let note = service.update(&code, req).await?;
    Ok(Json(note))
}

/// GET /notes/{code}/ownership - Check an owner token
#[utoipa::path(
    get,
    path = "/notes/{code}/ownership",
    tag = "Notes",
    params(
        ("code" = String, Path, description = "Note short code"),
        ("X-Owner-Token" = Option<String>, Header, description = "Owner token returned on create"),
    ),
    responses(
        (status = 200, description = "Whether the token belongs to this note", body = OwnershipResponse),
        (status = 404, description = "Note not found", body = ApiError),
    ),
)]
pub async fn check_ownership(
    State(service): State<Arc<NoteService>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<OwnershipResponse>> {
    let token = headers
        .get(OWNER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    let response = service.check_ownership(&code, token).await?;
    Ok(Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the note router, to be nested at `/notes`.
pub fn create_router(service: Arc<NoteService>) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::post(create_note))
        .route("/:code", axum::routing::get(get_note).patch(update_note))
        .route("/:code/ownership", axum::routing::get(check_ownership))
        .with_state(service)
}
