//! Short Code Allocator
//!
//! Generates random codes and validates caller-supplied ones. The store check
//! here is advisory; the unique index still has the final word at write time.

use notepad_core::{ShortCode, ShortCodeRules};
use notepad_storage::NoteStore;
use rand::distr::{Alphanumeric, SampleString};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

/// Finds free short codes.
#[derive(Clone)]
pub struct ShortCodeAllocator {
    store: Arc<dyn NoteStore>,
    rules: ShortCodeRules,
}

impl ShortCodeAllocator {
    pub fn new(store: Arc<dyn NoteStore>, rules: ShortCodeRules) -> Self {
        Self { store, rules }
    }

    /// A fresh random candidate. Not checked against the store.
    pub fn candidate(&self) -> ShortCode {
        let raw = Alphanumeric.sample_string(&mut rand::rng(), self.rules.effective_generated_length());
        ShortCode::from_stored(raw)
    }

    /// Try up to `max_attempts` random candidates and return the first one
    /// not present in the store.
    ///
    /// # Errors
    /// `ALLOCATION_EXHAUSTED` if every candidate collided.
    pub async fn generate_and_reserve(&self) -> ApiResult<ShortCode> {
        let attempts = self.rules.effective_max_attempts();
        for attempt in 1..=attempts {
            let code = self.candidate();
            if !self.store.note_code_exists(&code).await? {
                return Ok(code);
            }
            tracing::debug!(attempt, "Generated short code collided");
        }

        tracing::warn!(attempts, "Short code allocation exhausted");
        Err(ApiError::allocation_exhausted(attempts))
    }

    /// Validate a custom code: format and length first, then availability.
    ///
    /// # Errors
    /// Validation errors for a malformed or reserved code, `CODE_TAKEN` if in use.
    pub async fn validate_custom(&self, raw: &str) -> ApiResult<ShortCode> {
        let code = ShortCode::parse_custom(raw, &self.rules)?;
        self.ensure_available(&code).await?;
        Ok(code)
    }

    /// Availability half of [`Self::validate_custom`], for codes already
    /// parsed.
    pub async fn ensure_available(&self, code: &ShortCode) -> ApiResult<()> {
        if self.store.note_code_exists(code).await? {
            return Err(ApiError::code_taken(code));
        }
        Ok(())
    }
}
