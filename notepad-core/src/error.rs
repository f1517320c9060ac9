//! Error types for note input validation

use thiserror::Error;

/// Short code validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShortCodeError {
    #[error("Short code must be between {min} and {max} characters, got {actual}")]
    InvalidLength { min: usize, max: usize, actual: usize },

    #[error("Short code may only contain letters, digits, hyphens and underscores")]
    InvalidCharacters,

    #[error("Short code '{code}' is reserved")]
    Reserved { code: String },
}

/// Note content validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("Content must not be empty")]
    Empty,

    #[error("Content exceeds {max} characters (got {actual})")]
    TooManyChars { max: usize, actual: usize },

    #[error("Content exceeds {max} bytes (got {actual})")]
    TooManyBytes { max: usize, actual: usize },
}

/// Password policy errors.
///
/// These never carry the password itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordRuleError {
    #[error("Password must be between {min} and {max} characters")]
    InvalidLength { min: usize, max: usize },
}
