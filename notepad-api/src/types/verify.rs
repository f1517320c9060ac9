//! Password verification types

use serde::{Deserialize, Serialize};
use std::fmt;

use super::NoteResponse;

/// Request to check a note's password.
#[derive(Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordRequest {
    pub short_code: String,
    pub password: String,
}

impl fmt::Debug for VerifyPasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyPasswordRequest")
            .field("short_code", &self.short_code)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Verification result. `note` is present only when `valid` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VerifyPasswordResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<NoteResponse>,
}
