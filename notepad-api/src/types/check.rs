//! Short code availability types

use serde::{Deserialize, Serialize};

/// Whether a short code can be claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AvailabilityResponse {
    pub available: bool,
    /// Why the code cannot be used, when it is not a simple collision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
