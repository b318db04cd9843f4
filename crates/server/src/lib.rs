// crates/server/src/lib.rs
//! Postcraft server library.
//!
//! Axum-based HTTP server for the asynchronous content-generation job ledger:
//! job creation, one-shot polling, and per-job SSE status streams. Jobs are
//! executed by a separate worker process that writes its transitions through
//! the shared database.

pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod state;

pub use config::NotifierConfig;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, jobs)
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
