use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a [`Job`].
///
/// Transitions are restricted to `queued -> processing`, `processing ->
/// done`, `processing -> failed`, and `processing -> queued` (requeue).
/// `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// The unit of work tracked by the queue.
///
/// `payload` is immutable for the job's lifetime. `result` is set only on
/// `done`; `last_error` is set on `failed` and transiently on a retried
/// attempt, then cleared the next time the job re-enters `processing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub payload: Value,
    pub result: Option<Value>,
    pub last_error: Option<String>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Construct a freshly-created job: `status=queued`, `attempts=0`,
    /// `created_at == updated_at == now`, everything else absent.
    pub fn new(job_id: String, payload: Value, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            payload,
            result: None,
            last_error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
        }
    }
}
