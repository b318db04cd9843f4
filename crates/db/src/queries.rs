// crates/db/src/queries.rs
// Job ledger operations: create, fetch, and owner-scoped listing.
//
// The ledger is deliberately passive: nothing here transitions a job's
// status. Transitions belong to the worker process, which writes through
// the shared pool; these queries only observe its updates.

use crate::{Database, DbError, DbResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Allow-listed job kinds. Each kind maps to one worker handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    GeneratePost,
    GenerateImage,
    GenerateVariants,
    ExportContent,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::GeneratePost => "generate_post",
            JobKind::GenerateImage => "generate_image",
            JobKind::GenerateVariants => "generate_variants",
            JobKind::ExportContent => "export_content",
        }
    }
}

impl FromStr for JobKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate_post" => Ok(JobKind::GeneratePost),
            "generate_image" => Ok(JobKind::GenerateImage),
            "generate_variants" => Ok(JobKind::GenerateVariants),
            "export_content" => Ok(JobKind::ExportContent),
            _ => Err(()),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job lifecycle status.
///
/// Transitions are monotonic: `pending -> processing -> {completed, failed}`.
/// The worker enforces this; this crate only reads whatever is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the job ledger.
///
/// `result` is set only for `completed` jobs, `error` only for `failed` ones.
/// Timestamps are unix seconds; `started_at`/`completed_at` stay `None` until
/// the worker reaches that phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: i64,
    pub owner_id: String,
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: i64,
    pub priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<i64>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// Creation-time options beyond the required fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewJobOptions {
    /// Worker dequeue priority (higher first). 0 when unset.
    pub priority: Option<i64>,
    /// Earliest time (unix seconds) the worker should pick the job up.
    pub scheduled_for: Option<i64>,
}

/// Raw row as stored; enums and JSON arrive as TEXT.
#[derive(Debug)]
struct JobRow {
    id: i64,
    owner_id: String,
    kind: String,
    payload: String,
    status: String,
    result: Option<String>,
    error: Option<String>,
    attempts: i64,
    priority: i64,
    scheduled_for: Option<i64>,
    created_at: i64,
    started_at: Option<i64>,
    completed_at: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for JobRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            kind: row.try_get("kind")?,
            payload: row.try_get("payload")?,
            status: row.try_get("status")?,
            result: row.try_get("result")?,
            error: row.try_get("error")?,
            attempts: row.try_get("attempts")?,
            priority: row.try_get("priority")?,
            scheduled_for: row.try_get("scheduled_for")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

impl TryFrom<JobRow> for JobRecord {
    type Error = DbError;

    fn try_from(row: JobRow) -> Result<Self, DbError> {
        let kind = JobKind::from_str(&row.kind)
            .map_err(|_| DbError::InvalidRow(format!("unknown kind '{}'", row.kind)))?;
        let status = JobStatus::from_str(&row.status)
            .map_err(|_| DbError::InvalidRow(format!("unknown status '{}'", row.status)))?;
        let payload = serde_json::from_str(&row.payload)
            .map_err(|e| DbError::InvalidRow(format!("payload is not JSON: {e}")))?;
        let result = row
            .result
            .map(|r| serde_json::from_str(&r))
            .transpose()
            .map_err(|e| DbError::InvalidRow(format!("result is not JSON: {e}")))?;

        Ok(JobRecord {
            id: row.id,
            owner_id: row.owner_id,
            kind,
            payload,
            status,
            result,
            error: row.error,
            attempts: row.attempts,
            priority: row.priority,
            scheduled_for: row.scheduled_for,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

const JOB_COLUMNS: &str = "id, owner_id, kind, payload, status, result, error, \
     attempts, priority, scheduled_for, created_at, started_at, completed_at";

impl Database {
    /// Insert a new `pending` job owned by `owner` and return its id.
    ///
    /// `payload` is stored opaquely; validation of its shape is the worker's
    /// concern. Fails only if the storage layer is unavailable.
    pub async fn create_job(
        &self,
        owner: &str,
        kind: JobKind,
        payload: &serde_json::Value,
        options: NewJobOptions,
    ) -> DbResult<i64> {
        let payload_text = payload.to_string();
        let created_at = Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (owner_id, kind, payload, status, priority, scheduled_for, created_at)
            VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6)
            "#,
        )
        .bind(owner)
        .bind(kind.as_str())
        .bind(&payload_text)
        .bind(options.priority.unwrap_or(0))
        .bind(options.scheduled_for)
        .bind(created_at)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Fetch one job by id, without any ownership filter.
    ///
    /// Callers above this layer MUST compare `owner_id` against the caller's
    /// identity before exposing any field of the record.
    pub async fn get_job(&self, id: i64) -> DbResult<Option<JobRecord>> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"))
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        row.map(JobRecord::try_from).transpose()
    }

    /// List an owner's jobs, newest first.
    pub async fn list_jobs_for_owner(&self, owner: &str, limit: i64) -> DbResult<Vec<JobRecord>> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE owner_id = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))
        .bind(owner)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_round_trip() {
        for kind in [
            JobKind::GeneratePost,
            JobKind::GenerateImage,
            JobKind::GenerateVariants,
            JobKind::ExportContent,
        ] {
            assert_eq!(JobKind::from_str(kind.as_str()), Ok(kind));
        }
        assert!(JobKind::from_str("mine_bitcoin").is_err());
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_record_serializes_camel_case() {
        let record = JobRecord {
            id: 7,
            owner_id: "user_1".to_string(),
            kind: JobKind::GeneratePost,
            payload: serde_json::json!({"topic": "launch day"}),
            status: JobStatus::Pending,
            result: None,
            error: None,
            attempts: 0,
            priority: 0,
            scheduled_for: None,
            created_at: 1_700_000_000,
            started_at: None,
            completed_at: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"ownerId\":\"user_1\""));
        assert!(json.contains("\"kind\":\"generate_post\""));
        assert!(json.contains("\"status\":\"pending\""));
        assert!(json.contains("\"createdAt\":1700000000"));
        // None fields are skipped entirely
        assert!(!json.contains("result"));
        assert!(!json.contains("error"));
    }
}
