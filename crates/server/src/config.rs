// crates/server/src/config.rs
//! Runtime configuration for the status notifier.
//!
//! Constructed once per process (in `main.rs`) and handed to `AppState`;
//! call sites receive a copy instead of reaching into process globals.

use std::time::Duration;

/// Tuning knobs for a single status-stream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Fixed delay between job-row reads.
    pub poll_interval: Duration,
    /// Absolute wall-clock ceiling for one subscription. When it elapses the
    /// stream emits a `timeout` event and closes, whatever the job's state.
    pub stream_timeout: Duration,
    /// Consecutive read failures tolerated before the stream gives up.
    /// A successful read resets the count.
    pub error_budget: u32,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            stream_timeout: Duration::from_secs(300),
            error_budget: 10,
        }
    }
}

impl NotifierConfig {
    /// Build a config from environment variables, falling back to defaults:
    ///
    /// - `POSTCRAFT_POLL_INTERVAL_MS`
    /// - `POSTCRAFT_STREAM_TIMEOUT_SECS`
    /// - `POSTCRAFT_STREAM_ERROR_BUDGET`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: env_parse("POSTCRAFT_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            stream_timeout: env_parse("POSTCRAFT_STREAM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stream_timeout),
            error_budget: env_parse("POSTCRAFT_STREAM_ERROR_BUDGET")
                .unwrap_or(defaults.error_budget),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
