//! Server configuration.
//!
//! Values come from CLI flags with environment variable fallbacks (see
//! `Args` in `main.rs`). The `firebase` backend needs an API key, a database
//! URL and a storage bucket; the `memory` backend needs nothing.

use std::time::Duration;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5000;

/// Identity Toolkit REST base URL.
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Firebase Storage REST base URL.
pub const DEFAULT_STORAGE_URL: &str = "https://firebasestorage.googleapis.com/v0";

/// Timeout applied to every outbound request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Firebase Authentication, Realtime Database and Storage
    Firebase,
    /// Everything in process, nothing persisted
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub database_url: String,
    pub storage_bucket: String,
    /// Appended to database requests as `?auth=`.
    pub database_auth: Option<String>,
    pub identity_base_url: String,
    pub storage_base_url: String,
}

#[derive(Debug, Clone)]
pub enum BackendConfig {
    Firebase(FirebaseConfig),
    Memory {
        /// Treat the verification email as clicked the moment it is sent.
        auto_verify: bool,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub backend: BackendConfig,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend: BackendConfig::Memory { auto_verify: false },
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--{flag} (or {env}) is required for the firebase backend")]
    Missing {
        flag: &'static str,
        env: &'static str,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Unwrap a required firebase setting, treating blank values as missing.
pub fn required(
    value: Option<String>,
    flag: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { flag, env })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(matches!(
            config.backend,
            BackendConfig::Memory { auto_verify: false }
        ));
    }

    #[test]
    fn test_required() {
        assert_eq!(
            required(Some(" key ".into()), "firebase-api-key", "FIREBASE_API_KEY").unwrap(),
            "key"
        );
        let err = required(Some("  ".into()), "firebase-api-key", "FIREBASE_API_KEY").unwrap_err();
        assert_eq!(
            err.to_string(),
            "--firebase-api-key (or FIREBASE_API_KEY) is required for the firebase backend"
        );
        assert!(required(None, "firebase-api-key", "FIREBASE_API_KEY").is_err());
    }

    #[test]
    fn test_base_urls() {
        assert!(DEFAULT_IDENTITY_URL.starts_with("https://"));
        assert!(DEFAULT_STORAGE_URL.starts_with("https://"));
    }
}
