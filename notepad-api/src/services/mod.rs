//! Service Layer
//!
//! Business logic behind the HTTP handlers. Services own validation, state
//! transitions and store access, keeping request/response types as pure DTOs.

mod allocator;
mod note_service;
mod owner_token;
mod password_guard;

pub use allocator::*;
pub use note_service::*;
pub use owner_token::*;
pub use password_guard::*;
