// crates/server/src/notify/stream.rs
//! Async driver for a status-stream subscription.
//!
//! Owns the pacing: a fixed-interval sleep between reads, bounded by an
//! absolute deadline that can interrupt a sleep in progress. Event decisions
//! live in [`WatchMachine`]; this module only moves them onto a `Stream`.
//!
//! The stream is consumed by the SSE route. Dropping it (client disconnect)
//! cancels the loop at the next await point, releasing the poller.

use std::future::Future;

use postcraft_db::{Database, DbResult, JobRecord};
use tokio_stream::Stream;

use super::machine::{Tick, WatchMachine};
use crate::config::NotifierConfig;
use crate::notify::StreamEvent;

/// One-shot read of a job row. `Database` is the production reader; tests
/// substitute scripted fakes.
pub trait JobReader: Send + Sync + 'static {
    fn load(&self, id: i64) -> impl Future<Output = DbResult<Option<JobRecord>>> + Send;
}

impl JobReader for Database {
    fn load(&self, id: i64) -> impl Future<Output = DbResult<Option<JobRecord>>> + Send {
        self.get_job(id)
    }
}

/// Watch one job until it reaches a terminal state, the deadline elapses, or
/// the read-failure budget is exhausted.
///
/// `job` is the snapshot taken (and ownership-checked) at subscribe time; an
/// already-terminal snapshot yields exactly one event and never polls.
pub fn watch_stream<R: JobReader>(
    reader: R,
    job: JobRecord,
    config: NotifierConfig,
) -> impl Stream<Item = StreamEvent> {
    async_stream::stream! {
        let job_id = job.id;
        let deadline = tokio::time::Instant::now() + config.stream_timeout;
        let (mut machine, first) = WatchMachine::start(&job, config.error_budget);

        match first {
            Tick::Emit(event) => yield event,
            Tick::Close(event) => {
                tracing::debug!(job_id, event = event.name(), "status stream closed at subscribe");
                yield event;
                return;
            }
            Tick::Quiet => {}
        }

        loop {
            // The deadline interrupts a sleep in progress; a poll tick never
            // delays the timeout event.
            let slept = tokio::time::timeout_at(deadline, tokio::time::sleep(config.poll_interval)).await;
            if slept.is_err() {
                let event = machine.timed_out();
                tracing::debug!(job_id, "status stream timed out");
                yield event;
                break;
            }

            match machine.on_poll(reader.load(job_id).await) {
                Tick::Quiet => {}
                Tick::Emit(event) => yield event,
                Tick::Close(event) => {
                    tracing::debug!(job_id, event = event.name(), "status stream closed");
                    yield event;
                    break;
                }
            }
        }
    }
}
