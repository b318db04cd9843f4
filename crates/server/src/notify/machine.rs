// crates/server/src/notify/machine.rs
//! Transport-free state machine behind a status-stream subscription.
//!
//! `WatchMachine` decides *what* to emit; `notify::stream` decides *when*
//! (poll cadence, wall-clock ceiling) and carries events to the client.
//! Keeping the decision logic out of the request handler lets every event
//! sequence be unit-tested without a server or a clock.

use postcraft_db::{DbError, JobRecord, JobStatus};
use serde_json::json;

/// Machine-readable code attached to the terminal `error` event.
pub const STORAGE_UNAVAILABLE: &str = "storage_unavailable";

const DEFAULT_FAILURE_MESSAGE: &str = "job failed without a recorded error";

/// One event on the status stream, in the wire order it is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Current non-terminal state. `attempts` is carried while the worker is
    /// actively processing, so a subscriber can observe liveness.
    Status {
        job_id: i64,
        status: JobStatus,
        attempts: Option<i64>,
    },
    /// The job finished; carries the worker's result. Terminal.
    Completed { result: serde_json::Value },
    /// The job failed; carries the recorded error message. Terminal.
    Failed { error: String },
    /// The subscription outlived its wall-clock ceiling. Terminal for the
    /// stream only; the job keeps running.
    Timeout { message: String },
    /// The consecutive-read-failure budget was exhausted. Terminal for the
    /// stream only.
    Error { error: String, code: &'static str },
}

impl StreamEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Status { .. } => "status",
            StreamEvent::Completed { .. } => "completed",
            StreamEvent::Failed { .. } => "failed",
            StreamEvent::Timeout { .. } => "timeout",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// SSE data payload.
    pub fn data(&self) -> serde_json::Value {
        match self {
            StreamEvent::Status {
                job_id,
                status,
                attempts,
            } => {
                let mut data = json!({
                    "status": status.as_str(),
                    "jobId": job_id,
                });
                if let Some(attempts) = attempts {
                    data["attempts"] = json!(attempts);
                }
                data
            }
            StreamEvent::Completed { result } => json!({
                "status": "completed",
                "result": result,
            }),
            StreamEvent::Failed { error } => json!({
                "status": "failed",
                "error": error,
            }),
            StreamEvent::Timeout { message } => json!({ "message": message }),
            StreamEvent::Error { error, code } => json!({ "error": error, "code": code }),
        }
    }
}

/// What one machine step asks the driver to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// Nothing to deliver; keep polling.
    Quiet,
    /// Deliver one event; keep polling.
    Emit(StreamEvent),
    /// Deliver one final event, then close the channel.
    Close(StreamEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initial,
    Polling,
    Closing,
}

/// Per-subscription state: last observed status plus the error budget.
///
/// The machine never touches the job row; it only folds successive read
/// snapshots into the event sequence of one subscription.
#[derive(Debug)]
pub struct WatchMachine {
    phase: Phase,
    job_id: i64,
    last_status: JobStatus,
    consecutive_errors: u32,
    error_budget: u32,
}

impl WatchMachine {
    /// Start a subscription from the snapshot taken at subscribe time.
    ///
    /// An already-terminal job closes immediately with its single terminal
    /// event; the driver must not start a polling loop in that case.
    pub fn start(job: &JobRecord, error_budget: u32) -> (Self, Tick) {
        let mut machine = Self {
            phase: Phase::Initial,
            job_id: job.id,
            last_status: job.status,
            consecutive_errors: 0,
            error_budget,
        };

        if job.status.is_terminal() {
            machine.phase = Phase::Closing;
            return (machine, Tick::Close(terminal_event(job)));
        }

        machine.phase = Phase::Polling;
        let first = Tick::Emit(status_event(job));
        (machine, first)
    }

    /// Fold one poll outcome into the subscription.
    ///
    /// A missing row is treated the same as a read failure: nothing in this
    /// system deletes jobs, so an absent row is a storage-level anomaly and
    /// counts against the budget rather than ending the job.
    pub fn on_poll(&mut self, read: Result<Option<JobRecord>, DbError>) -> Tick {
        if self.phase != Phase::Polling {
            return Tick::Quiet;
        }

        let job = match read {
            Ok(Some(job)) => job,
            Ok(None) | Err(_) => {
                self.consecutive_errors += 1;
                if self.consecutive_errors >= self.error_budget {
                    self.phase = Phase::Closing;
                    return Tick::Close(StreamEvent::Error {
                        error: "job status unavailable".to_string(),
                        code: STORAGE_UNAVAILABLE,
                    });
                }
                return Tick::Quiet;
            }
        };
        self.consecutive_errors = 0;

        if job.status.is_terminal() {
            self.phase = Phase::Closing;
            return Tick::Close(terminal_event(&job));
        }

        if job.status == self.last_status {
            // Static pending state stays silent; active processing re-emits
            // so the subscriber sees attempt-count changes.
            return if job.status == JobStatus::Processing {
                Tick::Emit(status_event(&job))
            } else {
                Tick::Quiet
            };
        }

        self.last_status = job.status;
        Tick::Emit(status_event(&job))
    }

    /// The wall-clock ceiling elapsed. Closes the subscription.
    pub fn timed_out(&mut self) -> StreamEvent {
        self.phase = Phase::Closing;
        StreamEvent::Timeout {
            message: format!(
                "status stream for job {} timed out; re-subscribe or poll the job directly",
                self.job_id
            ),
        }
    }

    /// Whether the subscription has closed.
    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closing
    }
}

fn status_event(job: &JobRecord) -> StreamEvent {
    StreamEvent::Status {
        job_id: job.id,
        status: job.status,
        attempts: (job.status == JobStatus::Processing).then_some(job.attempts),
    }
}

fn terminal_event(job: &JobRecord) -> StreamEvent {
    match job.status {
        JobStatus::Completed => StreamEvent::Completed {
            result: job.result.clone().unwrap_or(serde_json::Value::Null),
        },
        JobStatus::Failed => StreamEvent::Failed {
            error: job
                .error
                .clone()
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
        },
        // start()/on_poll() only call this for terminal statuses
        JobStatus::Pending | JobStatus::Processing => unreachable!("terminal event for live job"),
    }
}
