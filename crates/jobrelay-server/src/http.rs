//! The HTTP Facade: `GET /ping`, `POST /jobs`, `GET /jobs/{job_id}`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use jobrelay_core::{Job, Queue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub fn router(queue: Queue) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/jobs", post(create_job))
        .route("/jobs/:job_id", get(get_job))
        .layer(TraceLayer::new_for_http())
        .with_state(queue)
}

#[derive(Serialize)]
struct PingResponse {
    message: &'static str,
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse { message: "pong" })
}

#[derive(Deserialize)]
struct CreateJobRequest {
    payload: Value,
}

#[derive(Serialize)]
struct CreateJobResponse {
    job_id: String,
}

/// Generates a fresh job id. The id generator is an external
/// collaborator of the Queue Protocol; this is the one place the server
/// calls it.
fn new_job_id() -> String {
    Uuid::new_v4().to_string()
}

async fn create_job(
    State(queue): State<Queue>,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<CreateJobResponse>, ApiError> {
    if !req.payload.is_object() {
        return Err(ApiError::BadRequest("payload must be a JSON object".to_string()));
    }

    let job_id = new_job_id();
    queue
        .create_job(&job_id, req.payload)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(CreateJobResponse { job_id }))
}

#[derive(Serialize)]
struct JobView {
    job_id: String,
    status: &'static str,
    result: Option<Value>,
    attempts: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status.as_str(),
            result: job.result,
            attempts: job.attempts,
            created_at: job.created_at,
            updated_at: job.updated_at,
            started_at: job.started_at,
            last_error: job.last_error,
        }
    }
}

async fn get_job(
    State(queue): State<Queue>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    match queue.get_job(&job_id).await.map_err(ApiError::from)? {
        Some(job) => Ok(Json(job.into())),
        None => Err(ApiError::NotFound),
    }
}

enum ApiError {
    BadRequest(String),
    NotFound,
    Internal(String),
}

impl From<jobrelay_core::QueueError> for ApiError {
    fn from(e: jobrelay_core::QueueError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Job not found".to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "detail": message }))).into_response()
    }
}
