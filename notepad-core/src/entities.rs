//! Note entity

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{NoteId, Timestamp};
use crate::short_code::ShortCode;

/// A stored note.
///
/// `password_hash` is a PHC-format string; it is `Some` iff the note is
/// password-protected. The plaintext password is never held here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub short_code: ShortCode,
    pub content: String,
    pub password_hash: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Note {
    pub fn is_protected(&self) -> bool {
        self.password_hash.is_some()
    }
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("id", &self.id)
            .field("short_code", &self.short_code)
            .field("content_len", &self.content.len())
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
