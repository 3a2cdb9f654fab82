//! REST API layer built on Axum.
//!
//! A small surface: a service descriptor, health/stats probes, the two
//! ingest endpoints, retrieval, and an index reset. Wrong-method
//! requests are rejected by the method routing (405); error bodies are
//! plain text.

/// API error type mapped to HTTP status codes.
pub mod errors;
/// HTTP request handlers and application state.
pub mod handlers;
/// Request and response data transfer objects.
pub mod models;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use contextdb_core::config;
use handlers::AppState;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the router with all routes and middleware (request tracing,
/// permissive CORS for local tooling, body size cap).
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/reset", post(handlers::reset))
        .route("/ingest", post(handlers::ingest))
        .route("/ingest_message", post(handlers::ingest_message))
        .route("/retrieve", post(handlers::retrieve))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(config::MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}
