//! In-memory note store.
//!
//! Enforces the same short code uniqueness the PostgreSQL unique index does,
//! so conflict handling can be exercised without a database.

use async_trait::async_trait;
use notepad_core::{Note, NoteId, ShortCode};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::store::{NoteStore, NoteUpdate, PasswordChange};

#[derive(Debug, Default)]
struct Inner {
    notes: HashMap<NoteId, Note>,
    /// short code -> note id, the uniqueness index
    codes: HashMap<ShortCode, NoteId>,
}

/// In-memory note store for tests and development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNoteStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryNoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored notes.
    pub fn note_count(&self) -> usize {
        self.read().map(|inner| inner.notes.len()).unwrap_or(0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend("note store lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend("note store lock poisoned"))
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn note_insert(&self, note: &Note) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.codes.contains_key(&note.short_code) {
            return Err(StoreError::Conflict {
                short_code: note.short_code.to_string(),
            });
        }
        if inner.notes.contains_key(&note.id) {
            return Err(StoreError::backend(format!("duplicate note id {}", note.id)));
        }
        inner.codes.insert(note.short_code.clone(), note.id);
        inner.notes.insert(note.id, note.clone());
        Ok(())
    }

    async fn note_get_by_code(&self, code: &ShortCode) -> StoreResult<Option<Note>> {
        let inner = self.read()?;
        Ok(inner
            .codes
            .get(code)
            .and_then(|id| inner.notes.get(id))
            .cloned())
    }

    async fn note_code_exists(&self, code: &ShortCode) -> StoreResult<bool> {
        Ok(self.read()?.codes.contains_key(code))
    }

    async fn note_update(&self, id: NoteId, update: NoteUpdate) -> StoreResult<Option<Note>> {
        let mut guard = self.write()?;
        let inner = &mut *guard;

        let Some(note) = inner.notes.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(new_code) = update.short_code {
            if new_code != note.short_code {
                if inner.codes.contains_key(&new_code) {
                    return Err(StoreError::Conflict {
                        short_code: new_code.to_string(),
                    });
                }
                inner.codes.remove(&note.short_code);
                inner.codes.insert(new_code.clone(), id);
                note.short_code = new_code;
            }
        }

        if let Some(content) = update.content {
            note.content = content;
        }

        match update.password {
            PasswordChange::Keep => {}
            PasswordChange::Set(hash) => note.password_hash = Some(hash),
            PasswordChange::Clear => note.password_hash = None,
        }

        note.updated_at = update.updated_at;
        Ok(Some(note.clone()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use notepad_core::new_note_id;

    fn make_note(code: &str) -> Note {
        let now = Utc::now();
        Note {
            id: new_note_id(),
            short_code: ShortCode::from_stored(code.to_string()),
            content: format!("content for {code}"),
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_note_insert_get() {
        let store = InMemoryNoteStore::new();
        let note = make_note("abc123");

        store.note_insert(&note).await.unwrap();
        let retrieved = store.note_get_by_code(&note.short_code).await.unwrap();

        assert_eq!(retrieved, Some(note));
        assert_eq!(store.note_count(), 1);
    }

    #[tokio::test]
    async fn test_note_insert_duplicate_code_conflicts() {
        let store = InMemoryNoteStore::new();
        let first = make_note("abc123");
        let second = make_note("abc123");

        store.note_insert(&first).await.unwrap();
        let result = store.note_insert(&second).await;

        assert_eq!(
            result,
            Err(StoreError::Conflict {
                short_code: "abc123".to_string()
            })
        );
        // The original row is untouched.
        let stored = store.note_get_by_code(&first.short_code).await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
    }

    #[tokio::test]
    async fn test_note_code_exists() {
        let store = InMemoryNoteStore::new();
        let note = make_note("exists1");
        store.note_insert(&note).await.unwrap();

        assert!(store.note_code_exists(&note.short_code).await.unwrap());
        assert!(!store
            .note_code_exists(&ShortCode::from_stored("missing".to_string()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_note_update_partial_fields() {
        let store = InMemoryNoteStore::new();
        let note = make_note("upd123");
        store.note_insert(&note).await.unwrap();

        let later = note.updated_at + Duration::seconds(5);
        let updated = store
            .note_update(
                note.id,
                NoteUpdate {
                    content: Some("new content".to_string()),
                    ..NoteUpdate::touch(later)
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.content, "new content");
        assert_eq!(updated.password_hash, None);
        assert_eq!(updated.created_at, note.created_at);
        assert_eq!(updated.updated_at, later);
    }

    #[tokio::test]
    async fn test_note_update_password_set_and_clear() {
        let store = InMemoryNoteStore::new();
        let note = make_note("pwd123");
        store.note_insert(&note).await.unwrap();

        let set = NoteUpdate {
            password: PasswordChange::Set("$argon2id$hash".to_string()),
            ..NoteUpdate::touch(Utc::now())
        };
        let updated = store.note_update(note.id, set).await.unwrap().unwrap();
        assert!(updated.is_protected());

        let clear = NoteUpdate {
            password: PasswordChange::Clear,
            ..NoteUpdate::touch(Utc::now())
        };
        let updated = store.note_update(note.id, clear).await.unwrap().unwrap();
        assert!(!updated.is_protected());
    }

    #[tokio::test]
    async fn test_note_update_short_code_moves_index() {
        let store = InMemoryNoteStore::new();
        let note = make_note("oldcode");
        store.note_insert(&note).await.unwrap();

        let new_code = ShortCode::from_stored("newcode".to_string());
        let update = NoteUpdate {
            short_code: Some(new_code.clone()),
            ..NoteUpdate::touch(Utc::now())
        };
        store.note_update(note.id, update).await.unwrap();

        assert!(store.note_get_by_code(&note.short_code).await.unwrap().is_none());
        let moved = store.note_get_by_code(&new_code).await.unwrap().unwrap();
        assert_eq!(moved.id, note.id);
    }

    #[tokio::test]
    async fn test_note_update_short_code_conflict() {
        let store = InMemoryNoteStore::new();
        let a = make_note("aaaaaa");
        let b = make_note("bbbbbb");
        store.note_insert(&a).await.unwrap();
        store.note_insert(&b).await.unwrap();

        let update = NoteUpdate {
            short_code: Some(b.short_code.clone()),
            content: Some("should not land".to_string()),
            ..NoteUpdate::touch(Utc::now())
        };
        let result = store.note_update(a.id, update).await;

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        let unchanged = store.note_get_by_code(&a.short_code).await.unwrap().unwrap();
        assert_eq!(unchanged.content, a.content);
    }

    #[tokio::test]
    async fn test_note_update_missing_returns_none() {
        let store = InMemoryNoteStore::new();
        let result = store
            .note_update(new_note_id(), NoteUpdate::touch(Utc::now()))
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
