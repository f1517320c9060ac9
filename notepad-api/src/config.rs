//! API Configuration Module
//!
//! This module provides configuration for CORS, rate limiting, note limits,
//! password hashing cost and other production-level API settings.
//! Configuration is loaded from environment variables with sensible defaults
//! for development.

use notepad_core::{ContentLimits, NoteLimits, PasswordRules, ShortCodeRules};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// Read and parse an environment variable, falling back to `default` when it
/// is unset or unparseable.
pub(crate) fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        })
        .unwrap_or(default)
}

// ============================================================================
// DEPLOYMENT ENVIRONMENT
// ============================================================================

/// Deployment environment, from `NOTEPAD_ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match std::env::var("NOTEPAD_ENVIRONMENT")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

// ============================================================================
// RATE LIMIT BACKEND
// ============================================================================

/// Where rate limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitBackend {
    /// In-process governor buckets. Counters are per instance.
    #[default]
    Local,
    /// Shared sliding-window counters in PostgreSQL.
    Postgres,
}

impl FromStr for RateLimitBackend {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "memory" => Ok(RateLimitBackend::Local),
            "postgres" | "pg" | "database" => Ok(RateLimitBackend::Postgres),
            other => Err(ApiError::invalid_input(format!(
                "Unknown rate limit backend: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS, rate limiting, and production hardening.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://notepad.run,https://www.notepad.run"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    /// Whether rate limiting is enabled.
    pub rate_limit_enabled: bool,

    /// Counter storage.
    pub rate_limit_backend: RateLimitBackend,

    /// General requests per minute per client IP.
    pub rate_limit_per_minute: u32,

    /// Password verification attempts per minute per client IP.
    pub rate_limit_verify_per_minute: u32,

    /// Burst capacity for the local limiter.
    pub rate_limit_burst: u32,

    /// Window size for rate limiting.
    pub rate_limit_window: Duration,

    /// How often idle local limiter entries are swept.
    pub rate_limit_sweep_interval: Duration,

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the socket
    /// address. Only safe behind a proxy that overwrites these headers.
    pub trust_proxy_headers: bool,

    // ========================================================================
    // Service
    // ========================================================================
    /// Base of the shareable URL returned on create, without trailing slash.
    pub public_base_url: String,

    pub environment: Environment,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            // CORS defaults: permissive for development
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400, // 24 hours

            rate_limit_enabled: true,
            rate_limit_backend: RateLimitBackend::Local,
            rate_limit_per_minute: 60,
            rate_limit_verify_per_minute: 10,
            rate_limit_burst: 10,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_sweep_interval: Duration::from_secs(300),
            trust_proxy_headers: false,

            public_base_url: "http://localhost:3000".to_string(),
            environment: Environment::Development,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `NOTEPAD_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `NOTEPAD_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `NOTEPAD_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `NOTEPAD_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `NOTEPAD_RATE_LIMIT_BACKEND`: "local" or "postgres" (default: local)
    /// - `NOTEPAD_RATE_LIMIT_PER_MINUTE`: Requests per minute per IP (default: 60)
    /// - `NOTEPAD_RATE_LIMIT_VERIFY_PER_MINUTE`: Verify attempts per minute per IP (default: 10)
    /// - `NOTEPAD_RATE_LIMIT_BURST`: Burst capacity (default: 10)
    /// - `NOTEPAD_RATE_LIMIT_SWEEP_SECS`: Idle entry sweep interval (default: 300)
    /// - `NOTEPAD_TRUST_PROXY_HEADERS`: "true" to key clients by forwarding headers (default: false)
    /// - `NOTEPAD_PUBLIC_BASE_URL`: Base of share URLs (default: http://localhost:3000)
    /// - `NOTEPAD_ENVIRONMENT`: "production" enables strict validation
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("NOTEPAD_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_backend = std::env::var("NOTEPAD_RATE_LIMIT_BACKEND")
            .ok()
            .and_then(|s| match s.parse() {
                Ok(backend) => Some(backend),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring NOTEPAD_RATE_LIMIT_BACKEND");
                    None
                }
            })
            .unwrap_or(defaults.rate_limit_backend);

        let public_base_url = std::env::var("NOTEPAD_PUBLIC_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.public_base_url);

        Self {
            cors_origins,
            cors_allow_credentials: env_flag(
                "NOTEPAD_CORS_ALLOW_CREDENTIALS",
                defaults.cors_allow_credentials,
            ),
            cors_max_age_secs: env_parse("NOTEPAD_CORS_MAX_AGE_SECS", defaults.cors_max_age_secs),
            rate_limit_enabled: env_flag("NOTEPAD_RATE_LIMIT_ENABLED", defaults.rate_limit_enabled),
            rate_limit_backend,
            rate_limit_per_minute: env_parse(
                "NOTEPAD_RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),
            rate_limit_verify_per_minute: env_parse(
                "NOTEPAD_RATE_LIMIT_VERIFY_PER_MINUTE",
                defaults.rate_limit_verify_per_minute,
            ),
            rate_limit_burst: env_parse("NOTEPAD_RATE_LIMIT_BURST", defaults.rate_limit_burst),
            rate_limit_window: defaults.rate_limit_window,
            rate_limit_sweep_interval: Duration::from_secs(env_parse(
                "NOTEPAD_RATE_LIMIT_SWEEP_SECS",
                defaults.rate_limit_sweep_interval.as_secs(),
            )),
            trust_proxy_headers: env_flag(
                "NOTEPAD_TRUST_PROXY_HEADERS",
                defaults.trust_proxy_headers,
            ),
            public_base_url,
            environment: Environment::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            // Dev mode: allow all
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Support wildcard subdomains: *.notepad.run
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain == pattern
                        || origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }

    /// Reject configurations that are unsafe to run in production.
    ///
    /// `owner_secret_configured` is passed in because the secret itself is
    /// held by the owner token issuer, not by this struct.
    pub fn validate_for_production(&self, owner_secret_configured: bool) -> ApiResult<()> {
        if !self.is_production() {
            return Ok(());
        }
        if self.cors_origins.is_empty() {
            return Err(ApiError::invalid_input(
                "NOTEPAD_CORS_ORIGINS must be set in production",
            ));
        }
        if !owner_secret_configured {
            return Err(ApiError::invalid_input(
                "NOTEPAD_OWNER_TOKEN_SECRET must be set in production",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// NOTE LIMITS
// ============================================================================

/// Load note input limits from the environment.
///
/// - `NOTEPAD_MAX_CONTENT_CHARS` (default: 100000)
/// - `NOTEPAD_MAX_CONTENT_BYTES` (default: 1048576)
/// - `NOTEPAD_CODE_LENGTH`: generated code length, clamped to 6..=8 (default: 8)
/// - `NOTEPAD_CODE_MIN` / `NOTEPAD_CODE_MAX`: custom code bounds (default: 6 / 50)
/// - `NOTEPAD_CODE_ATTEMPTS`: allocation attempts (default: 5)
pub fn note_limits_from_env() -> NoteLimits {
    let content = ContentLimits::default();
    let codes = ShortCodeRules::default();
    let passwords = PasswordRules::default();

    NoteLimits {
        content: ContentLimits {
            max_chars: env_parse("NOTEPAD_MAX_CONTENT_CHARS", content.max_chars),
            max_bytes: env_parse("NOTEPAD_MAX_CONTENT_BYTES", content.max_bytes),
        },
        short_codes: ShortCodeRules {
            generated_length: env_parse("NOTEPAD_CODE_LENGTH", codes.generated_length),
            custom_min: env_parse("NOTEPAD_CODE_MIN", codes.custom_min),
            custom_max: env_parse("NOTEPAD_CODE_MAX", codes.custom_max),
            max_attempts: env_parse("NOTEPAD_CODE_ATTEMPTS", codes.max_attempts),
        },
        passwords,
    }
}

// ============================================================================
// PASSWORD HASHING
// ============================================================================

/// Argon2id cost parameters and the failed-verification delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub failure_delay: Duration,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP baseline for Argon2id
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
            failure_delay: Duration::from_secs(1),
        }
    }
}

impl PasswordConfig {
    /// Create PasswordConfig from environment variables.
    ///
    /// - `NOTEPAD_ARGON2_MEMORY_KIB` (default: 19456)
    /// - `NOTEPAD_ARGON2_ITERATIONS` (default: 2)
    /// - `NOTEPAD_ARGON2_PARALLELISM` (default: 1)
    /// - `NOTEPAD_VERIFY_FAILURE_DELAY_MS` (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_kib: env_parse("NOTEPAD_ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_parse("NOTEPAD_ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_parse("NOTEPAD_ARGON2_PARALLELISM", defaults.parallelism),
            failure_delay: Duration::from_millis(env_parse(
                "NOTEPAD_VERIFY_FAILURE_DELAY_MS",
                defaults.failure_delay.as_millis() as u64,
            )),
        }
    }

    /// Cheap parameters for tests. Never use in production.
    pub fn for_testing() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
            failure_delay: Duration::ZERO,
        }
    }
}

// ============================================================================
// STORE SELECTION
// ============================================================================

/// Which note store backs the service, from `NOTEPAD_STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Postgres,
    /// Process-local store. Notes are lost on restart.
    Memory,
}

impl StoreKind {
    pub fn from_env() -> Self {
        match std::env::var("NOTEPAD_STORE")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "memory" | "in-memory" => StoreKind::Memory,
            _ => StoreKind::Postgres,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_backend, RateLimitBackend::Local);
        assert_eq!(config.rate_limit_per_minute, 60);
        assert_eq!(config.rate_limit_verify_per_minute, 10);
        assert!(!config.trust_proxy_headers);
        assert_eq!(config.public_base_url, "http://localhost:3000");
    }

    #[test]
    fn test_origin_allowed_dev_mode() {
        let config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.com"));
        assert!(config.is_origin_allowed("http://localhost:3000"));
    }

    #[test]
    fn test_origin_allowed_production() {
        let mut config = ApiConfig::default();
        config.cors_origins = vec!["https://notepad.run".to_string()];

        assert!(config.is_origin_allowed("https://notepad.run"));
        assert!(!config.is_origin_allowed("https://evil.com"));
        assert!(!config.is_origin_allowed("http://notepad.run"));
    }

    #[test]
    fn test_wildcard_subdomain() {
        let mut config = ApiConfig::default();
        config.cors_origins = vec!["*.notepad.run".to_string()];

        assert!(config.is_origin_allowed("https://app.notepad.run"));
        assert!(config.is_origin_allowed("https://notepad.run"));
        assert!(!config.is_origin_allowed("https://evilnotepad.run"));
    }

    #[test]
    fn test_production_validation() {
        let mut config = ApiConfig::default();
        assert!(config.validate_for_production(false).is_ok());

        config.environment = Environment::Production;
        assert!(config.validate_for_production(true).is_err());

        config.cors_origins = vec!["https://notepad.run".to_string()];
        assert!(config.validate_for_production(false).is_err());
        assert!(config.validate_for_production(true).is_ok());
    }

    #[test]
    fn test_rate_limit_backend_parse() {
        assert_eq!("postgres".parse::<RateLimitBackend>().ok(), Some(RateLimitBackend::Postgres));
        assert_eq!("LOCAL".parse::<RateLimitBackend>().ok(), Some(RateLimitBackend::Local));
        assert!("redis".parse::<RateLimitBackend>().is_err());
    }

    #[test]
    fn test_password_config_defaults() {
        let config = PasswordConfig::default();
        assert_eq!(config.memory_kib, 19_456);
        assert_eq!(config.failure_delay, Duration::from_secs(1));
        assert_eq!(PasswordConfig::for_testing().failure_delay, Duration::ZERO);
    }
}
