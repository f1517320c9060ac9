//! Notepad Storage - Note Store Trait and In-Memory Implementation
//!
//! Defines the storage seam for notes. The PostgreSQL implementation lives
//! in notepad-api next to its connection pool; the in-memory store here
//! backs tests and the `memory` development mode.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryNoteStore;
pub use store::{NoteStore, NoteUpdate, PasswordChange};
