//! Owner Tokens
//!
//! An owner token is `hex(HMAC-SHA256(secret, note_id))`, handed to the
//! creator of a note. It proves creation and nothing more: it grants no
//! mutation rights. Tokens bind to the note id, so they survive short code
//! changes.

use hmac::{Hmac, Mac};
use notepad_core::NoteId;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice};
use sha2::Sha256;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

type HmacSha256 = Hmac<Sha256>;

/// Env var holding the signing secret.
pub const OWNER_TOKEN_SECRET_ENV: &str = "NOTEPAD_OWNER_TOKEN_SECRET";

const GENERATED_SECRET_LEN: usize = 32;

/// Issues and checks owner tokens.
#[derive(Clone)]
pub struct OwnerTokenIssuer {
    secret: Arc<SecretSlice<u8>>,
    configured: bool,
}

impl std::fmt::Debug for OwnerTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerTokenIssuer")
            .field("secret", &"[REDACTED]")
            .field("configured", &self.configured)
            .finish()
    }
}

impl OwnerTokenIssuer {
    /// Use an explicit secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> ApiResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ApiError::invalid_input("Owner token secret must not be empty"));
        }
        Ok(Self {
            secret: Arc::new(SecretSlice::from(secret)),
            configured: true,
        })
    }

    /// Random per-process secret. Tokens stop verifying after a restart.
    pub fn ephemeral() -> Self {
        let mut secret = vec![0u8; GENERATED_SECRET_LEN];
        rand::rng().fill_bytes(&mut secret);
        Self {
            secret: Arc::new(SecretSlice::from(secret)),
            configured: false,
        }
    }

    /// Read `NOTEPAD_OWNER_TOKEN_SECRET`, falling back to an ephemeral secret.
    pub fn from_env() -> Self {
        match std::env::var(OWNER_TOKEN_SECRET_ENV) {
            Ok(value) if !value.trim().is_empty() => Self {
                secret: Arc::new(SecretSlice::from(value.into_bytes())),
                configured: true,
            },
            _ => {
                tracing::warn!(
                    "{} not set, owner tokens will not survive a restart",
                    OWNER_TOKEN_SECRET_ENV
                );
                Self::ephemeral()
            }
        }
    }

    /// Whether the secret came from configuration rather than the RNG.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    fn mac(&self) -> ApiResult<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.expose_secret())
            .map_err(|_| ApiError::internal_error("Failed to initialize HMAC"))
    }

    /// Issue the token for a note.
    pub fn issue(&self, note_id: NoteId) -> ApiResult<String> {
        let mut mac = self.mac()?;
        mac.update(note_id.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time check of a presented token. Bad hex is simply `false`.
    pub fn verify(&self, note_id: NoteId, token: &str) -> bool {
        let Ok(presented) = hex::decode(token.trim()) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(note_id.as_bytes());
        mac.verify_slice(&presented).is_ok()
    }
}
