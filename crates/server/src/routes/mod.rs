//! API route handlers for the postcraft server.

pub mod health;
pub mod jobs;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health           - Health check
/// - POST /api/jobs             - Enqueue a generation job
/// - GET  /api/jobs             - List the caller's jobs
/// - GET  /api/jobs/{id}        - One-shot poll of a job
/// - GET  /api/jobs/{id}/events - SSE stream of job status transitions
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let db = postcraft_db::Database::new_in_memory().await.expect("in-memory DB");
        let state = AppState::new(db);
        let _router = api_routes(state);
    }
}
