//! Password Guard
//!
//! Argon2id hashing and verification for note passwords. Both operations are
//! CPU-bound and run on Tokio's blocking pool.
//!
//! Every failed verification, whatever the cause, is delayed by the
//! configured `failure_delay` before it returns.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::config::PasswordConfig;
use crate::error::{ApiError, ApiResult};

/// Salt length in bytes, the PHC recommended 16.
const SALT_LEN: usize = 16;

/// Hashes and verifies note passwords.
#[derive(Debug, Clone)]
pub struct PasswordGuard {
    params: Params,
    failure_delay: Duration,
}

impl PasswordGuard {
    /// Build a guard from cost parameters.
    ///
    /// # Errors
    /// Returns an internal error if the Argon2 parameters are out of range.
    pub fn new(config: &PasswordConfig) -> ApiResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| ApiError::internal_error(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self {
            params,
            failure_delay: config.failure_delay,
        })
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Returns a PHC string embedding algorithm, cost and salt.
    pub async fn hash(&self, password: &str) -> ApiResult<String> {
        let password = SecretString::new(password.into());
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::encode_b64(&rand::random::<[u8; SALT_LEN]>())?;
            Self::argon2(params)
                .hash_password(password.expose_secret().as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|e| ApiError::internal_error(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::internal_error("Password hashing failed")
        })
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// A malformed hash or an internal failure counts as a mismatch.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let password = SecretString::new(password.into());
        let stored_hash = stored_hash.to_string();
        let params = self.params.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)?;
            Self::argon2(params).verify_password(password.expose_secret().as_bytes(), &parsed)
        })
        .await;

        let valid = match outcome {
            Ok(Ok(())) => true,
            Ok(Err(argon2::password_hash::Error::Password)) => false,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Stored password hash could not be checked");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        };

        if !valid {
            self.delay_failure().await;
        }
        valid
    }

    /// Fail a check that had no password to verify.
    ///
    /// Takes the same failure delay as a wrong password, so a missing proof
    /// cannot be told apart from a wrong one by timing.
    pub async fn reject(&self) -> bool {
        self.delay_failure().await;
        false
    }

    async fn delay_failure(&self) {
        if !self.failure_delay.is_zero() {
            tokio::time::sleep(self.failure_delay).await;
        }
    }
}
