//! Password Verification Route

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    extractors::ValidatedJson,
    services::{NoteService, VerifyOutcome},
    types::{NoteResponse, VerifyPasswordRequest, VerifyPasswordResponse},
};

/// POST /verify - Check a note's password
///
/// A wrong password is a `200 {"valid": false}`, not an error.
#[utoipa::path(
    post,
    path = "/verify",
    tag = "Notes",
    request_body = VerifyPasswordRequest,
    responses(
        (status = 200, description = "Verification result; the note is included when valid", body = VerifyPasswordResponse),
        (status = 400, description = "Note is not password protected", body = ApiError),
        (status = 404, description = "Note not found", body = ApiError),
        (status = 429, description = "Too many attempts", body = ApiError),
    ),
)]
pub async fn verify_password(
    State(service): State<Arc<NoteService>>,
    ValidatedJson(req): ValidatedJson<VerifyPasswordRequest>,
) -> ApiResult<Json<VerifyPasswordResponse>> {
    let response = match service.verify_password(&req.short_code, &req.password).await? {
        VerifyOutcome::Valid(note) => VerifyPasswordResponse {
            valid: true,
            note: Some(NoteResponse::revealed(note)),
        },
        VerifyOutcome::Invalid => VerifyPasswordResponse {
            valid: false,
            note: None,
        },
    };
    Ok(Json(response))
}

/// Create the verify router, to be nested at `/verify`.
pub fn create_router(service: Arc<NoteService>) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::post(verify_password))
        .with_state(service)
}
