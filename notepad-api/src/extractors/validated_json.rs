//! JSON body extractor with API-shaped rejections.
//!
//! Wraps `axum::Json` so malformed bodies come back as [`ApiError`] with the
//! usual `{error, message}` shape instead of axum's plain-text rejections.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

static MISSING_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"missing field `([A-Za-z0-9_]+)`").expect("Invalid missing field regex"));

/// JSON body extractor that rejects with [`ApiError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let text = err.body_text();
            if let Some(field) = MISSING_FIELD.captures(&text).and_then(|c| c.get(1)) {
                return ApiError::missing_field(field.as_str());
            }
            let detail = text
                .split_once("target type: ")
                .map(|(_, detail)| detail)
                .unwrap_or("unexpected field types");
            ApiError::invalid_input(format!("Invalid request body: {}", detail))
        }
        JsonRejection::JsonSyntaxError(_) => ApiError::invalid_input("Request body is not valid JSON"),
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::invalid_input("Expected request with `Content-Type: application/json`")
        }
        JsonRejection::BytesRejection(err) => {
            tracing::debug!(error = %err.body_text(), "Request body rejected");
            ApiError::validation_failed("Request body could not be read or is too large")
        }
        other => {
            tracing::debug!(error = %other.body_text(), "JSON extraction failed");
            ApiError::invalid_input("Invalid request body")
        }
    }
}
