//! Notepad Core - Entity Types
//!
//! Pure data structures and input rules with no I/O. All other crates
//! depend on this one.

pub mod entities;
pub mod error;
pub mod identity;
pub mod limits;
pub mod short_code;

pub use entities::Note;
pub use error::{ContentError, PasswordRuleError, ShortCodeError};
pub use identity::{new_note_id, NoteId, Timestamp};
pub use limits::{ContentLimits, NoteLimits, PasswordRules, ShortCodeRules};
pub use short_code::{ShortCode, RESERVED_CODES};
