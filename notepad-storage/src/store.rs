//! Async note store trait.
//!
//! The store owns the source of truth for short code uniqueness. Callers may
//! check with [`NoteStore::note_code_exists`] first, but must still handle
//! [`crate::StoreError::Conflict`] from writes.

use async_trait::async_trait;
use notepad_core::{Note, NoteId, ShortCode, Timestamp};

use crate::error::StoreResult;

/// What to do with a note's password hash on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PasswordChange {
    /// Leave the hash untouched.
    #[default]
    Keep,
    /// Replace (or set) the hash.
    Set(String),
    /// Remove protection.
    Clear,
}

/// Partial update for a note. `updated_at` is always written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteUpdate {
    pub content: Option<String>,
    pub password: PasswordChange,
    pub short_code: Option<ShortCode>,
    pub updated_at: Timestamp,
}

impl NoteUpdate {
    /// An update that only refreshes `updated_at`.
    pub fn touch(updated_at: Timestamp) -> Self {
        Self {
            content: None,
            password: PasswordChange::Keep,
            short_code: None,
            updated_at,
        }
    }
}

/// Persistence for notes.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a new note.
    ///
    /// Returns [`crate::StoreError::Conflict`] if the short code is taken.
    async fn note_insert(&self, note: &Note) -> StoreResult<()>;

    /// Get a note by its short code.
    async fn note_get_by_code(&self, code: &ShortCode) -> StoreResult<Option<Note>>;

    /// Check whether a short code is in use.
    async fn note_code_exists(&self, code: &ShortCode) -> StoreResult<bool>;

    /// Apply a partial update to the note with the given id.
    ///
    /// Returns the updated note, or `None` if no note has that id.
    /// Returns [`crate::StoreError::Conflict`] if a new short code is taken.
    async fn note_update(&self, id: NoteId, update: NoteUpdate) -> StoreResult<Option<Note>>;

    /// Cheap connectivity check for readiness checks.
    async fn health_check(&self) -> StoreResult<()>;
}
