//! Short code newtype.
//!
//! A short code is the public, URL-safe lookup key of a note. Format checks
//! live here; availability is a store concern and is checked elsewhere.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ShortCodeError;
use crate::limits::ShortCodeRules;

/// Allowed character class for every short code, generated or custom.
static SHORT_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid short code regex"));

/// Codes that would shadow a route segment.
pub const RESERVED_CODES: &[&str] = &[
    "api", "check", "health", "metrics", "notes", "openapi", "verify",
];

/// A syntactically valid short code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Validate a caller-supplied code against the custom code rules.
    pub fn parse_custom(raw: &str, rules: &ShortCodeRules) -> Result<Self, ShortCodeError> {
        let len = raw.chars().count();
        if len < rules.custom_min || len > rules.custom_max {
            return Err(ShortCodeError::InvalidLength {
                min: rules.custom_min,
                max: rules.custom_max,
                actual: len,
            });
        }

        if !Self::is_well_formed(raw) {
            return Err(ShortCodeError::InvalidCharacters);
        }

        let lowered = raw.to_ascii_lowercase();
        if RESERVED_CODES.contains(&lowered.as_str()) {
            return Err(ShortCodeError::Reserved {
                code: raw.to_string(),
            });
        }

        Ok(Self(raw.to_string()))
    }

    /// Parse a code used as a lookup key.
    ///
    /// Lookups only need the character class: anything that passes can be
    /// checked, anything that fails cannot exist in the store.
    pub fn parse_lookup(raw: &str) -> Result<Self, ShortCodeError> {
        if !Self::is_well_formed(raw) {
            return Err(ShortCodeError::InvalidCharacters);
        }
        Ok(Self(raw.to_string()))
    }

    /// Wrap a code read back from the store.
    pub fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    /// Check the character class only.
    pub fn is_well_formed(raw: &str) -> bool {
        SHORT_CODE_PATTERN.is_match(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_custom_accepts_valid_codes() {
        let rules = ShortCodeRules::default();
        for code in ["abc123", "my-note", "my_note_2024", "ABCDEF"] {
            let parsed = ShortCode::parse_custom(code, &rules);
            assert_eq!(parsed.map(ShortCode::into_inner), Ok(code.to_string()));
        }
    }

    #[test]
    fn test_parse_custom_rejects_bad_length() {
        let rules = ShortCodeRules::default();
        assert_eq!(
            ShortCode::parse_custom("abc", &rules),
            Err(ShortCodeError::InvalidLength {
                min: 6,
                max: 50,
                actual: 3
            })
        );
        let long = "a".repeat(51);
        assert!(matches!(
            ShortCode::parse_custom(&long, &rules),
            Err(ShortCodeError::InvalidLength { actual: 51, .. })
        ));
    }

    #[test]
    fn test_parse_custom_rejects_bad_characters() {
        let rules = ShortCodeRules::default();
        for code in ["has space", "slash/abc", "emoji\u{1F600}x", "dot.dot.dot", "ümlaut1"] {
            assert_eq!(
                ShortCode::parse_custom(code, &rules),
                Err(ShortCodeError::InvalidCharacters),
                "{code}"
            );
        }
    }

    #[test]
    fn test_parse_custom_rejects_reserved() {
        let rules = ShortCodeRules {
            custom_min: 3,
            ..ShortCodeRules::default()
        };
        assert!(matches!(
            ShortCode::parse_custom("Health", &rules),
            Err(ShortCodeError::Reserved { .. })
        ));
    }

    #[test]
    fn test_parse_lookup_only_checks_charset() {
        assert!(ShortCode::parse_lookup("ab").is_ok());
        assert!(ShortCode::parse_lookup("").is_err());
        assert!(ShortCode::parse_lookup("a b").is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let code = ShortCode::from_stored("abc123".to_string());
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"abc123\"");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_accepted_custom_codes_respect_bounds(raw in "\\PC{0,60}") {
            let rules = ShortCodeRules::default();
            if let Ok(code) = ShortCode::parse_custom(&raw, &rules) {
                let len = code.as_str().chars().count();
                prop_assert!((rules.custom_min..=rules.custom_max).contains(&len));
                prop_assert!(ShortCode::is_well_formed(code.as_str()));
            }
        }

        #[test]
        fn prop_well_formed_codes_in_range_are_accepted(raw in "[A-Za-z0-9_-]{6,50}") {
            let rules = ShortCodeRules::default();
            let lowered = raw.to_ascii_lowercase();
            prop_assume!(!RESERVED_CODES.contains(&lowered.as_str()));
            prop_assert!(ShortCode::parse_custom(&raw, &rules).is_ok());
        }
    }
}
