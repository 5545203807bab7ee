//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FRESHMART_API_URL` - Base URL of the REST backend (e.g. `https://api.example.in/`)
//! - `FRESHMART_API_TOKEN` - Bearer token for the signed-in user
//! - `FRESHMART_USER_ID` - Id of the signed-in user
//!
//! ## Optional
//! - `FRESHMART_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `FRESHMART_NOTICE_TTL_MS` - How long notices stay visible (default: 2000, clamped to 1500-3000)
//! - `FRESHMART_CATALOG_CACHE_TTL_SECS` - Product/category cache TTL (default: 300)
//! - `FRESHMART_LOG_JSON` - Emit JSON logs when `true` (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::time::Duration;

use freshmart_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_NOTICE_TTL_MS: u64 = 1500;
const MAX_NOTICE_TTL_MS: u64 = 3000;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend base URL (always ends with `/`)
    pub api_url: Url,
    /// Bearer token
    pub api_token: SecretString,
    /// Signed-in user
    pub user_id: UserId,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Notice auto-expiry
    pub notice_ttl: Duration,
    /// Catalog cache TTL
    pub catalog_cache_ttl: Duration,
    /// JSON log output
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("request_timeout", &self.request_timeout)
            .field("notice_ttl", &self.notice_ttl)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .field("log_json", &self.log_json)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[SET]"))
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_base_url(&get_required_env("FRESHMART_API_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("FRESHMART_API_URL".to_string(), e))?;
        let api_token = get_validated_secret("FRESHMART_API_TOKEN")?;
        let user_id = UserId::new(get_required_env("FRESHMART_USER_ID")?);

        let request_timeout =
            Duration::from_secs(get_parsed_or_default("FRESHMART_REQUEST_TIMEOUT_SECS", 30)?);
        let notice_ttl = clamp_notice_ttl(get_parsed_or_default("FRESHMART_NOTICE_TTL_MS", 2000)?);
        let catalog_cache_ttl =
            Duration::from_secs(get_parsed_or_default("FRESHMART_CATALOG_CACHE_TTL_SECS", 300)?);
        let log_json = get_parsed_or_default("FRESHMART_LOG_JSON", false)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_url,
            api_token,
            user_id,
            request_timeout,
            notice_ttl,
            catalog_cache_ttl,
            log_json,
            sentry_dsn,
        })
    }

    /// Configuration for a backend at `api_url`, with defaults elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse.
    pub fn new(
        api_url: &str,
        api_token: impl Into<String>,
        user_id: UserId,
    ) -> Result<Self, ConfigError> {
        let api_url = parse_base_url(api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("FRESHMART_API_URL".to_string(), e))?;
        Ok(Self {
            api_url,
            api_token: SecretString::from(api_token.into()),
            user_id,
            request_timeout: Duration::from_secs(30),
            notice_ttl: Duration::from_millis(2000),
            catalog_cache_ttl: Duration::from_secs(300),
            log_json: false,
            sentry_dsn: None,
        })
    }

    /// The bearer token value.
    #[must_use]
    pub fn bearer(&self) -> &str {
        self.api_token.expose_secret()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, making sure relative joins keep its path.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Clamp the notice TTL to the window users can read but not be annoyed by.
fn clamp_notice_ttl(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(MIN_NOTICE_TTL_MS, MAX_NOTICE_TTL_MS))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to a default when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Validate that a secret is not a placeholder.
fn validate_secret(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "is empty".to_string(),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = parse_base_url("http://localhost:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/");
        assert_eq!(
            url.join("cart/add").unwrap().as_str(),
            "http://localhost:5000/api/cart/add"
        );
    }

    #[test]
    fn test_base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("mailto:ops@example.in").is_err());
    }

    #[test]
    fn test_notice_ttl_clamped() {
        assert_eq!(clamp_notice_ttl(100), Duration::from_millis(1500));
        assert_eq!(clamp_notice_ttl(2000), Duration::from_millis(2000));
        assert_eq!(clamp_notice_ttl(10_000), Duration::from_millis(3000));
    }

    #[test]
    fn test_validate_secret_placeholder() {
        let err = validate_secret("your-token-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret("", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_valid() {
        assert!(validate_secret("eyJhbGciOiJIUzI1NiJ9.eyJpZCI6IjEifQ.sig", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = ClientConfig::new(
            "http://localhost:5000",
            "super_secret_bearer_token",
            UserId::new("u1"),
        )
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("localhost:5000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer_token"));
    }
}
