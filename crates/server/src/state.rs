// crates/server/src/state.rs
//! Application state for the Axum server.

use crate::config::NotifierConfig;
use postcraft_db::Database;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Database handle for the job ledger.
    pub db: Database,
    /// Notifier tuning. Uses `std::sync::RwLock` (not `tokio::sync::RwLock`)
    /// because reads take a `Copy` snapshot and the lock is never held across
    /// an `.await` point.
    notifier: RwLock<NotifierConfig>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(db: Database) -> Arc<Self> {
        Self::with_notifier_config(db, NotifierConfig::default())
    }

    /// Create state with an explicit notifier configuration.
    pub fn with_notifier_config(db: Database, config: NotifierConfig) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            notifier: RwLock::new(config),
        })
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Snapshot of the notifier config. Each subscription captures one
    /// snapshot at subscribe time; a later reconfigure affects new
    /// subscriptions only.
    pub fn notifier_config(&self) -> NotifierConfig {
        match self.notifier.read() {
            Ok(cfg) => *cfg,
            Err(e) => {
                tracing::error!("RwLock poisoned reading notifier config: {e}");
                NotifierConfig::default()
            }
        }
    }

    /// Replace the notifier config for subsequent subscriptions.
    pub fn set_notifier_config(&self, config: NotifierConfig) {
        match self.notifier.write() {
            Ok(mut cfg) => *cfg = config,
            Err(e) => tracing::error!("RwLock poisoned writing notifier config: {e}"),
        }
    }
}
