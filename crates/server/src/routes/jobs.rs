// crates/server/src/routes/jobs.rs
//! API routes for asynchronous generation jobs.
//!
//! - POST /jobs              — enqueue a job
//! - GET  /jobs              — list the caller's jobs
//! - GET  /jobs/{id}         — one-shot poll of a job
//! - GET  /jobs/{id}/events  — SSE stream of status transitions
//!
//! Ownership policy: a job that exists but belongs to someone else is
//! reported exactly like a job that does not exist (404 on every path here),
//! so probing for ids reveals nothing.

use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

use postcraft_db::{JobKind, JobRecord, JobStatus, NewJobOptions};

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::notify::watch_stream;
use crate::state::AppState;

/// Request body for POST /api/jobs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    /// One of the allow-listed kinds; anything else is a 400.
    pub kind: String,
    /// Opaque worker input; defaults to `{}`.
    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
    pub priority: Option<i64>,
    pub scheduled_for: Option<i64>,
}

fn empty_payload() -> serde_json::Value {
    serde_json::json!({})
}

/// Response body for POST /api/jobs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub job_id: i64,
    pub status: JobStatus,
}

/// Query parameters for GET /api/jobs.
#[derive(Debug, Deserialize)]
struct ListJobsQuery {
    /// Maximum number of jobs to return (default: 20).
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// POST /api/jobs — enqueue one unit of asynchronous work.
async fn create_job(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    let kind = JobKind::from_str(&req.kind)
        .map_err(|_| ApiError::BadRequest(format!("unknown job kind '{}'", req.kind)))?;

    let job_id = state
        .db
        .create_job(
            &caller.user_id,
            kind,
            &req.payload,
            NewJobOptions {
                priority: req.priority,
                scheduled_for: req.scheduled_for,
            },
        )
        .await?;

    tracing::info!(job_id, kind = %kind, "job created");
    Ok((
        StatusCode::CREATED,
        Json(CreateJobResponse {
            job_id,
            status: JobStatus::Pending,
        }),
    ))
}

/// GET /api/jobs — the caller's jobs, newest first.
async fn list_jobs(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let limit = query.limit.clamp(1, 200);
    let jobs = state.db.list_jobs_for_owner(&caller.user_id, limit).await?;
    Ok(Json(serde_json::json!({
        "jobs": jobs,
        "total": jobs.len(),
    })))
}

/// GET /api/jobs/{id} — one-shot poll of the full job record.
async fn get_job(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<JobRecord>> {
    let job = fetch_owned(&state, &caller, id).await?;
    Ok(Json(job))
}

/// GET /api/jobs/{id}/events — long-lived SSE stream of status transitions.
///
/// Emits the event vocabulary of [`crate::notify::StreamEvent`]; the stream
/// closes after any terminal event. Client disconnect tears the poller down
/// at its next await point.
async fn stream_job_events(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let job = fetch_owned(&state, &caller, id).await?;
    let config = state.notifier_config();
    tracing::debug!(job_id = id, status = %job.status, "status stream opened");

    let stream = watch_stream(state.db.clone(), job, config).map(|event| {
        Ok::<_, Infallible>(Event::default().event(event.name()).data(event.data().to_string()))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

/// Load a job and enforce ownership. Absent and not-owned collapse into the
/// same `JobNotFound`.
async fn fetch_owned(state: &AppState, caller: &Caller, id: i64) -> ApiResult<JobRecord> {
    let job = state.db.get_job(id).await?.ok_or(ApiError::JobNotFound(id))?;
    if job.owner_id != caller.user_id {
        return Err(ApiError::JobNotFound(id));
    }
    Ok(job)
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/events", get(stream_job_events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IDENTITY_HEADER;
    use axum::body::Body;
    use axum::http::Request;
    use postcraft_db::Database;
    use tower::ServiceExt;

    async fn test_app() -> (Arc<AppState>, Router) {
        let db = Database::new_in_memory().await.unwrap();
        let state = AppState::new(db);
        let app = Router::new()
            .nest("/api", router())
            .with_state(Arc::clone(&state));
        (state, app)
    }

    fn post_json(uri: &str, user: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header(IDENTITY_HEADER, user)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_as(uri: &str, user: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(IDENTITY_HEADER, user)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_fetch_job() {
        let (_state, app) = test_app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/jobs",
                "user_a",
                serde_json::json!({"kind": "generate_post", "payload": {"topic": "launch"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["status"], "pending");
        let job_id = created["jobId"].as_i64().unwrap();

        let response = app
            .oneshot(get_as(&format!("/api/jobs/{job_id}"), "user_a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let job = body_json(response).await;
        assert_eq!(job["id"], job_id);
        assert_eq!(job["kind"], "generate_post");
        assert_eq!(job["payload"]["topic"], "launch");
        assert_eq!(job["ownerId"], "user_a");
    }

    #[tokio::test]
    async fn test_unknown_kind_is_rejected() {
        let (_state, app) = test_app().await;

        let response = app
            .oneshot(post_json(
                "/api/jobs",
                "user_a",
                serde_json::json!({"kind": "tweetstorm"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["details"].as_str().unwrap().contains("tweetstorm"));
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let (_state, app) = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/jobs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_foreign_job_is_indistinguishable_from_absent() {
        let (state, app) = test_app().await;

        let id = state
            .db
            .create_job(
                "user_a",
                JobKind::GeneratePost,
                &serde_json::json!({"secret": "campaign"}),
                NewJobOptions::default(),
            )
            .await
            .unwrap();

        let foreign = app
            .clone()
            .oneshot(get_as(&format!("/api/jobs/{id}"), "user_b"))
            .await
            .unwrap();
        let absent = app
            .clone()
            .oneshot(get_as("/api/jobs/999999", "user_b"))
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        assert_eq!(absent.status(), StatusCode::NOT_FOUND);

        // No payload/result/error leakage in the 404 body
        let body = body_json(foreign).await;
        assert!(!body.to_string().contains("campaign"));

        // Same policy on the stream path
        let stream = app
            .oneshot(get_as(&format!("/api/jobs/{id}/events"), "user_b"))
            .await
            .unwrap();
        assert_eq!(stream.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_jobs_is_owner_scoped() {
        let (state, app) = test_app().await;

        for owner in ["user_a", "user_a", "user_b"] {
            state
                .db
                .create_job(
                    owner,
                    JobKind::GenerateImage,
                    &serde_json::json!({}),
                    NewJobOptions::default(),
                )
                .await
                .unwrap();
        }

        let response = app.oneshot(get_as("/api/jobs?limit=10", "user_a")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total"], 2);
        for job in body["jobs"].as_array().unwrap() {
            assert_eq!(job["ownerId"], "user_a");
        }
    }

    #[tokio::test]
    async fn test_stream_of_terminal_job_closes_after_one_event() {
        let (state, app) = test_app().await;

        let id = state
            .db
            .create_job(
                "user_a",
                JobKind::GenerateVariants,
                &serde_json::json!({}),
                NewJobOptions::default(),
            )
            .await
            .unwrap();
        sqlx::query("UPDATE jobs SET status = 'completed', result = '{\"x\":1}' WHERE id = ?1")
            .bind(id)
            .execute(state.db.pool())
            .await
            .unwrap();

        let response = app
            .oneshot(get_as(&format!("/api/jobs/{id}/events"), "user_a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );

        // Terminal at subscribe: the stream ends immediately, so the whole
        // body can be read without waiting on a poll tick.
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("event: completed"));
        assert!(text.contains("\"result\":{\"x\":1}"));
        assert_eq!(text.matches("event:").count(), 1);
    }
}
