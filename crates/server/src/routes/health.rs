// crates/server/src/routes/health.rs
//! Liveness endpoint: process uptime plus job-ledger reachability.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// `ok` when the job ledger answers, `degraded` when it does not.
    pub status: String,
    /// Ledger probe outcome: `reachable` or `unreachable`.
    pub database: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /api/health — process liveness plus a ledger probe.
///
/// Always answers 200: a failed probe is reported in the body, so an
/// external monitor can tell "server down" from "storage down". Job status
/// streams degrade independently through their own error budget.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(()) => "reachable",
        Err(e) => {
            tracing::warn!(error = %e, "health probe: job ledger unreachable");
            "unreachable"
        }
    };

    Json(HealthResponse {
        status: if database == "reachable" { "ok" } else { "degraded" }.to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Create the health routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
