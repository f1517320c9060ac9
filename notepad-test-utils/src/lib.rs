//! Notepad Test Utilities
//!
//! Shared test infrastructure for the notepad workspace:
//! - Proptest generators for short codes, content and passwords
//! - Note fixtures and store seeding
//! - Assertions over store state

// Re-export the in-memory store from its source crate
pub use notepad_storage::InMemoryNoteStore;

// Re-export core types for convenience
pub use notepad_core::{
    new_note_id, ContentLimits, Note, NoteId, NoteLimits, PasswordRules, ShortCode,
    ShortCodeRules, Timestamp, RESERVED_CODES,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for note inputs.

    use super::*;
    use proptest::prelude::*;

    /// A custom code the default rules accept.
    ///
    /// Reserved words are 3 to 7 characters and never contain `_` or `-`, so
    /// anything starting with `n_` cannot collide with one.
    pub fn arb_custom_code() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{4,48}".prop_map(|tail| format!("n_{}", tail))
    }

    /// A code that is too short for the default custom rules.
    pub fn arb_short_custom_code() -> impl Strategy<Value = String> {
        "[A-Za-z0-9]{1,5}"
    }

    /// A code of valid length containing at least one forbidden character.
    pub fn arb_code_with_bad_char() -> impl Strategy<Value = String> {
        (
            "[A-Za-z0-9]{3,10}",
            prop::sample::select(vec!['/', ' ', '.', '!', '?', '#', '%', 'é']),
            "[A-Za-z0-9]{3,10}",
        )
            .prop_map(|(head, bad, tail)| format!("{}{}{}", head, bad, tail))
    }

    /// Any reserved code, in random case.
    pub fn arb_reserved_code() -> impl Strategy<Value = String> {
        (prop::sample::select(RESERVED_CODES.to_vec()), any::<u64>()).prop_map(|(code, mask)| {
            code.chars()
                .enumerate()
                .map(|(i, c)| {
                    if mask & (1 << (i % 64)) != 0 {
                        c.to_ascii_uppercase()
                    } else {
                        c
                    }
                })
                .collect()
        })
    }

    /// Non-blank note content, including multi-byte characters.
    pub fn arb_content() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 \n\u{e9}\u{4e2d}\u{1f600}]{0,200}".prop_map(|body| format!("x{}", body))
    }

    /// A password the default rules accept.
    pub fn arb_password() -> impl Strategy<Value = String> {
        "[ -~]{1,64}"
    }

    pub fn arb_note_id() -> impl Strategy<Value = NoteId> {
        any::<u128>().prop_map(uuid::Uuid::from_u128)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built notes and stores.

    use super::*;
    use chrono::Utc;
    use notepad_storage::{NoteStore, StoreResult};

    /// An unprotected note with the given code.
    pub fn note(code: &str, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id: new_note_id(),
            short_code: ShortCode::from_stored(code.to_string()),
            content: content.to_string(),
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A note carrying an opaque hash. The hash does not need to be a
    /// valid PHC string unless the test verifies against it.
    pub fn protected_note(code: &str, content: &str, password_hash: &str) -> Note {
        Note {
            password_hash: Some(password_hash.to_string()),
            ..note(code, content)
        }
    }

    /// Small limits that make boundary tests cheap.
    pub fn tight_limits() -> NoteLimits {
        NoteLimits {
            content: ContentLimits {
                max_chars: 16,
                max_bytes: 32,
            },
            short_codes: ShortCodeRules {
                generated_length: 6,
                custom_min: 6,
                custom_max: 12,
                max_attempts: 3,
            },
            passwords: PasswordRules {
                min_chars: 4,
                max_chars: 16,
            },
        }
    }

    /// A store pre-populated with `notes`.
    pub async fn seeded_store(notes: &[Note]) -> StoreResult<InMemoryNoteStore> {
        let store = InMemoryNoteStore::new();
        for note in notes {
            store.note_insert(note).await?;
        }
        Ok(store)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over note store state.

    use super::*;
    use notepad_storage::NoteStore;

    /// Assert that a code resolves to a note and return it.
    pub async fn assert_stored(store: &InMemoryNoteStore, code: &str) -> Note {
        let code = ShortCode::from_stored(code.to_string());
        match store.note_get_by_code(&code).await {
            Ok(Some(note)) => note,
            other => panic!("Expected note {} to be stored, got: {:?}", code, other),
        }
    }

    /// Assert that no note uses a code.
    pub async fn assert_not_stored(store: &InMemoryNoteStore, code: &str) {
        let code = ShortCode::from_stored(code.to_string());
        match store.note_code_exists(&code).await {
            Ok(false) => {}
            other => panic!("Expected no note at {}, got: {:?}", code, other),
        }
    }

    /// Assert that a stored note's hash is a PHC string and not the plaintext.
    #[track_caller]
    pub fn assert_hash_not_plaintext(note: &Note, password: &str) {
        let hash = note
            .password_hash
            .as_deref()
            .unwrap_or_else(|| panic!("Expected note {} to be protected", note.short_code));
        assert_ne!(hash, password, "password stored in plaintext");
        assert!(hash.starts_with("$argon2"), "not an argon2 PHC string: {}", hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::assertions::*;
    use super::fixtures::*;
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_custom_codes_are_accepted(code in arb_custom_code()) {
            prop_assert!(ShortCode::parse_custom(&code, &ShortCodeRules::default()).is_ok());
        }

        #[test]
        fn prop_reserved_codes_are_rejected(code in arb_reserved_code()) {
            // Reserved words are shorter than the default minimum, so relax it.
            let rules = ShortCodeRules { custom_min: 1, ..ShortCodeRules::default() };
            prop_assert!(ShortCode::parse_custom(&code, &rules).is_err());
        }

        #[test]
        fn prop_bad_chars_are_rejected(code in arb_code_with_bad_char()) {
            prop_assert!(ShortCode::parse_custom(&code, &ShortCodeRules::default()).is_err());
        }
    }

    #[tokio::test]
    async fn test_seeded_store_and_assertions() {
        let store = seeded_store(&[note("abc123", "hello"), note("xyz789", "world")])
            .await
            .unwrap();
        assert_eq!(store.note_count(), 2);
        assert_eq!(assert_stored(&store, "abc123").await.content, "hello");
        assert_not_stored(&store, "nope00").await;
    }

    #[tokio::test]
    async fn test_seeded_store_rejects_duplicate_codes() {
        let result = seeded_store(&[note("dup123", "a"), note("dup123", "b")]).await;
        assert!(result.is_err());
    }
}
