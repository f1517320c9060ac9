//! Short Code Availability Route

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    services::NoteService,
    types::AvailabilityResponse,
};

/// GET /check/{code} - Check whether a custom short code is free
#[utoipa::path(
    get,
    path = "/check/{code}",
    tag = "Notes",
    params(
        ("code" = String, Path, description = "Candidate short code")
    ),
    responses(
        (status = 200, description = "Availability; invalid codes are unavailable with a reason", body = AvailabilityResponse),
        (status = 500, description = "Store failure", body = ApiError),
    ),
)]
pub async fn check_availability(
    State(service): State<Arc<NoteService>>,
    Path(code): Path<String>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let response = service.check_availability(&code).await?;
    Ok(Json(response))
}

/// Create the availability router, to be nested at `/check`.
pub fn create_router(service: Arc<NoteService>) -> axum::Router {
    axum::Router::new()
        .route("/:code", axum::routing::get(check_availability))
        .with_state(service)
}
