// crates/server/src/notify/mod.rs
//! Status notifier: turns the polled job ledger into a push stream.
//!
//! - `machine` — the per-subscription state machine (what to emit)
//! - `stream` — the async polling driver (when to read, when to stop)

pub mod machine;
pub mod stream;

pub use machine::{StreamEvent, Tick, WatchMachine};
pub use stream::{watch_stream, JobReader};
