//! Input limits for notes, short codes and passwords.
//!
//! All checks here run before any store access, so a rejected input never
//! costs a database round-trip.

use serde::{Deserialize, Serialize};

use crate::error::{ContentError, PasswordRuleError};

/// Default maximum note length in characters.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 100_000;

/// Default maximum note size in UTF-8 bytes (1 MiB).
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;

/// Bounds for generated short code length.
pub const GENERATED_CODE_MIN_LEN: usize = 6;
pub const GENERATED_CODE_MAX_LEN: usize = 8;

/// Content size ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLimits {
    pub max_chars: usize,
    pub max_bytes: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CONTENT_CHARS,
            max_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }
}

impl ContentLimits {
    /// Check both ceilings. Empty content is allowed here; creation
    /// additionally calls [`ContentLimits::validate_non_empty`].
    pub fn validate(&self, content: &str) -> Result<(), ContentError> {
        // Byte length first: it is O(1) and bounds the char count anyway.
        let bytes = content.len();
        if bytes > self.max_bytes {
            return Err(ContentError::TooManyBytes {
                max: self.max_bytes,
                actual: bytes,
            });
        }

        let chars = content.chars().count();
        if chars > self.max_chars {
            return Err(ContentError::TooManyChars {
                max: self.max_chars,
                actual: chars,
            });
        }

        Ok(())
    }

    /// Validate content for a new note: non-blank and within the ceilings.
    pub fn validate_non_empty(&self, content: &str) -> Result<(), ContentError> {
        if content.trim().is_empty() {
            return Err(ContentError::Empty);
        }
        self.validate(content)
    }
}

/// Short code generation and custom code bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortCodeRules {
    /// Length of generated codes, clamped to 6..=8.
    pub generated_length: usize,
    /// Minimum length for caller-supplied codes.
    pub custom_min: usize,
    /// Maximum length for caller-supplied codes.
    pub custom_max: usize,
    /// How many generated candidates to try before giving up.
    pub max_attempts: u32,
}

impl Default for ShortCodeRules {
    fn default() -> Self {
        Self {
            generated_length: GENERATED_CODE_MAX_LEN,
            custom_min: 6,
            custom_max: 50,
            max_attempts: 5,
        }
    }
}

impl ShortCodeRules {
    /// Generated length clamped into the supported range.
    pub fn effective_generated_length(&self) -> usize {
        self.generated_length
            .clamp(GENERATED_CODE_MIN_LEN, GENERATED_CODE_MAX_LEN)
    }

    /// At least one attempt is always made.
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Password length bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRules {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for PasswordRules {
    fn default() -> Self {
        Self {
            min_chars: 1,
            max_chars: 128,
        }
    }
}

impl PasswordRules {
    pub fn validate(&self, password: &str) -> Result<(), PasswordRuleError> {
        let len = password.chars().count();
        if len < self.min_chars || len > self.max_chars {
            return Err(PasswordRuleError::InvalidLength {
                min: self.min_chars,
                max: self.max_chars,
            });
        }
        Ok(())
    }
}

/// All note input limits in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteLimits {
    pub content: ContentLimits,
    pub short_codes: ShortCodeRules,
    pub passwords: PasswordRules,
}
