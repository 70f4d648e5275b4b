//! HTTP surface.
//!
//! Each route group carries its own state (identity gateway, certificate
//! registry, ambassador registry); all of them share the same backends.

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ambassador::{self, AmbassadorRegistry};
use crate::blob::BlobUploader;
use crate::certificate::{self, CertificateRegistry, BLOB_PREFIX};
use crate::identity::{self, IdentityGateway};
use crate::state::Backends;

pub fn router(backends: &Backends) -> Router {
    let gateway = IdentityGateway::new(backends.identity.clone(), backends.records.clone());
    let certificates = CertificateRegistry::new(
        backends.records.clone(),
        BlobUploader::new(backends.blobs.clone(), BLOB_PREFIX),
    );
    let ambassadors = AmbassadorRegistry::new(backends.records.clone());

    let identity_routes = Router::new()
        .route("/register", post(identity::api::register))
        .route("/login", post(identity::api::login))
        .with_state(gateway);

    let certificate_routes = Router::new()
        .route(
            "/upload",
            post(certificate::api::upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/verify", post(certificate::api::verify))
        .with_state(certificates);

    let ambassador_routes = Router::new()
        .route("/campus-ambassador", post(ambassador::api::register))
        .with_state(ambassadors);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(identity_routes)
        .merge(certificate_routes)
        .merge(ambassador_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Liveness text.
async fn root_handler() -> &'static str {
    "App is working"
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "isrc-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
