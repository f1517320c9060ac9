//! Identity types for notes

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Note identifier using UUIDv7 for timestamp-sortable IDs.
/// Assigned once at creation and never reused, even if the short code changes.
pub type NoteId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 NoteId (timestamp-sortable).
pub fn new_note_id() -> NoteId {
    Uuid::now_v7()
}
