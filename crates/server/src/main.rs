// crates/server/src/main.rs
//! Postcraft server binary.
//!
//! Opens the job ledger, builds the Axum app, and serves the API. The worker
//! process that executes jobs runs separately and shares the database file.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use postcraft_db::Database;
use postcraft_server::{create_app, AppState, NotifierConfig};
use tracing_subscriber::EnvFilter;

/// Default port for the server.
const DEFAULT_PORT: u16 = 47710;

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("POSTCRAFT_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Explicit database path override, if set.
fn get_db_path() -> Option<PathBuf> {
    std::env::var("POSTCRAFT_DB").ok().map(PathBuf::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("postcraft=info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db = match get_db_path() {
        Some(path) => Database::new(&path).await?,
        None => Database::open_default().await?,
    };

    let state = AppState::with_notifier_config(db, NotifierConfig::from_env());
    let app = create_app(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], get_port()));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("postcraft v{} listening on http://{addr}", env!("CARGO_PKG_VERSION"));

    axum::serve(listener, app).await?;
    Ok(())
}
