//! API Request and Response Types
//!
//! Request bodies use camelCase field names. The note payload itself keeps
//! snake_case field names.

// Note types
mod note;
pub use note::*;

// Password verification types
mod verify;
pub use verify::*;

// Availability types
mod check;
pub use check::*;

/// Redacted stand-in for secrets in `Debug` output.
pub(crate) fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}
