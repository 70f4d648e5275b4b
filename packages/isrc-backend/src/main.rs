//! ISRC Backend Server
//!
//! HTTP backend for the ISRC site. It handles:
//!
//! 1. **Accounts**: email/password registration with a verification email,
//!    and login gated on a verified address. A profile is mirrored into
//!    `users/{uid}`.
//!
//! 2. **Certificates**: upload a certificate file under an auth code, then
//!    verify an auth code to get the certificate's download URL back.
//!
//! 3. **Campus ambassadors**: store signup forms.
//!
//! Identity, records and files live in Firebase (Authentication, Realtime
//! Database, Storage). A `memory` backend keeps everything in process for
//! local development.

mod ambassador;
mod blob;
mod certificate;
mod config;
mod error;
mod fields;
mod identity;
mod records;
mod routes;
mod state;

use std::time::Duration;

use clap::Parser;

use config::{
    required, BackendConfig, BackendKind, ConfigError, FirebaseConfig, LogFormat, ServerConfig,
    DEFAULT_IDENTITY_URL, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STORAGE_URL,
};
use state::Backends;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "isrc-backend", version, about = "ISRC backend server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    port: u16,

    /// Which backends to use
    #[arg(long, value_enum, default_value_t = BackendKind::Firebase, env = "BACKEND")]
    backend: BackendKind,

    /// Firebase web API key
    #[arg(long, env = "FIREBASE_API_KEY")]
    firebase_api_key: Option<String>,

    /// Realtime Database URL (e.g. https://<project>-default-rtdb.firebaseio.com)
    #[arg(long, env = "FIREBASE_DATABASE_URL")]
    firebase_database_url: Option<String>,

    /// Storage bucket (e.g. <project>.appspot.com)
    #[arg(long, env = "FIREBASE_STORAGE_BUCKET")]
    firebase_storage_bucket: Option<String>,

    /// Database secret or access token, sent as `?auth=`
    #[arg(long, env = "FIREBASE_DATABASE_AUTH")]
    firebase_database_auth: Option<String>,

    /// Identity Toolkit base URL
    #[arg(long, default_value = DEFAULT_IDENTITY_URL, env = "FIREBASE_IDENTITY_URL")]
    identity_base_url: String,

    /// Storage base URL
    #[arg(long, default_value = DEFAULT_STORAGE_URL, env = "FIREBASE_STORAGE_URL")]
    storage_base_url: String,

    /// Timeout for outbound requests, in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: u64,

    /// Memory backend only: verify accounts as soon as they register
    #[arg(long, env = "MEMORY_AUTO_VERIFY")]
    memory_auto_verify: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, env = "LOG_FORMAT")]
    log_format: LogFormat,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let backend = match self.backend {
            BackendKind::Firebase => BackendConfig::Firebase(FirebaseConfig {
                api_key: required(self.firebase_api_key, "firebase-api-key", "FIREBASE_API_KEY")?,
                database_url: required(
                    self.firebase_database_url,
                    "firebase-database-url",
                    "FIREBASE_DATABASE_URL",
                )?,
                storage_bucket: required(
                    self.firebase_storage_bucket,
                    "firebase-storage-bucket",
                    "FIREBASE_STORAGE_BUCKET",
                )?,
                database_auth: self.firebase_database_auth.filter(|a| !a.is_empty()),
                identity_base_url: self.identity_base_url,
                storage_base_url: self.storage_base_url,
            }),
            BackendKind::Memory => BackendConfig::Memory {
                auto_verify: self.memory_auto_verify,
            },
        };

        Ok(ServerConfig {
            port: self.port,
            backend,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "isrc_backend=info,tower_http=info".into());
    match args.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let backends = match Backends::from_config(&config) {
        Ok(backends) => backends,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize backends");
            std::process::exit(1);
        }
    };

    match &config.backend {
        BackendConfig::Firebase(firebase) => tracing::info!(
            database = firebase.database_url.as_str(),
            bucket = firebase.storage_bucket.as_str(),
            "Using Firebase backends"
        ),
        BackendConfig::Memory { auto_verify } => tracing::warn!(
            auto_verify = *auto_verify,
            "Using in-memory backends, nothing will be persisted"
        ),
    }

    let app = routes::router(&backends);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("ISRC backend starting on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = addr.as_str(), error = %e, "Failed to bind address");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("isrc-backend").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_memory_backend_args() {
        let config = parse(&["--backend", "memory", "--memory-auto-verify", "--port", "8081"])
            .into_config()
            .unwrap();
        assert_eq!(config.port, 8081);
        assert!(matches!(
            config.backend,
            BackendConfig::Memory { auto_verify: true }
        ));
    }

    #[test]
    fn test_firebase_backend_args() {
        let config = parse(&[
            "--backend",
            "firebase",
            "--firebase-api-key",
            "key",
            "--firebase-database-url",
            "https://isrc-default-rtdb.firebaseio.com",
            "--firebase-storage-bucket",
            "isrc.appspot.com",
            "--request-timeout-secs",
            "5",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        match config.backend {
            BackendConfig::Firebase(firebase) => {
                assert_eq!(firebase.api_key, "key");
                assert_eq!(firebase.storage_bucket, "isrc.appspot.com");
                assert_eq!(firebase.identity_base_url, DEFAULT_IDENTITY_URL);
                assert!(firebase.database_auth.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_firebase_backend_requires_bucket() {
        let err = parse(&[
            "--backend",
            "firebase",
            "--firebase-api-key",
            "key",
            "--firebase-database-url",
            "https://isrc-default-rtdb.firebaseio.com",
            "--firebase-storage-bucket",
            "",
        ])
        .into_config()
        .unwrap_err();
        assert!(err.to_string().contains("firebase-storage-bucket"));
    }
}
