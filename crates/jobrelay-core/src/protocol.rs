use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::QueueError;
use crate::model::{Job, JobStatus};
use crate::repository::{self, job_key};
use crate::store::StoreAdapter;

/// Parameters of the reliable-claim protocol that are not tied to a
/// specific store or clock implementation.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// WaitingList key.
    pub queue_key: String,
    /// ProcessingList key.
    pub processing_key: String,
    /// Total attempts permitted, including the first.
    pub max_attempts: u32,
    /// Seconds a job may sit in `processing` before the reaper reclaims it.
    pub processing_timeout_s: i64,
}

/// The reliable-claim state machine: `create`, `claim`, `mark_processing`,
/// `mark_done`, `mark_failed`, `requeue`, `scan_stuck`.
///
/// Cheaply cloneable: `store` and `clock` are held behind `Arc` so a
/// `Queue` handle can be shared across the HTTP Facade, every Worker Loop
/// task, and the Reaper Loop task.
#[derive(Clone)]
pub struct Queue {
    store: Arc<dyn StoreAdapter>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
}

impl Queue {
    pub fn new(store: Arc<dyn StoreAdapter>, clock: Arc<dyn Clock>, config: QueueConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Create a job's record and enqueue it. No error is surfaced for a
    /// duplicate id — the caller's id generator guarantees uniqueness.
    ///
    /// The hash write completes before the enqueue so a racing claimer
    /// always finds a readable record.
    pub async fn create_job(&self, job_id: &str, payload: Value) -> Result<(), QueueError> {
        let now = self.clock.now();
        let job = Job::new(job_id.to_string(), payload, now);
        self.store
            .hset_all(&job_key(job_id), repository::encode(&job))
            .await?;
        self.store.lpush(&self.config.queue_key, job_id).await?;
        debug!(job_id, "created job");
        Ok(())
    }

    /// Read and decode a job's record. `None` if absent or malformed.
    pub async fn get_job(&self, job_id: &str) -> Result<Option<Job>, QueueError> {
        let Some(fields) = self.store.hget_all(&job_key(job_id)).await? else {
            return Ok(None);
        };
        match repository::decode(job_id, &fields) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                warn!(job_id, error = %e, "get_job: malformed record, treating as absent");
                Ok(None)
            }
        }
    }

    /// Atomically claim the next waiting job id. Does not touch the job's
    /// record; the caller must call [`Queue::mark_processing`] before
    /// doing any work.
    pub async fn claim(&self, block_seconds: u64) -> Result<Option<String>, QueueError> {
        let claimed = self
            .store
            .brpop_lpush(&self.config.queue_key, &self.config.processing_key, block_seconds)
            .await?;
        if let Some(id) = &claimed {
            debug!(job_id = %id, "claimed job");
        }
        Ok(claimed)
    }

    /// Remove a stray id from ProcessingList without touching any record.
    /// Used defensively by the Worker Loop when a claimed id has no
    /// backing job record.
    pub async fn drop_stray_claim(&self, job_id: &str) -> Result<(), QueueError> {
        self.store
            .lrem(&self.config.processing_key, 1, job_id)
            .await?;
        Ok(())
    }

    /// Record entry into `processing`: increments `attempts`, sets
    /// `started_at`/`updated_at`, clears `last_error`.
    ///
    /// Issues targeted field-level `hset`/`hincr` calls with no preceding
    /// read — the waiting/processing lists are the source of truth for
    /// who may execute a job, so this blindly writes the authoritative
    /// fields once the caller holds the claim, and `attempts` is
    /// incremented atomically rather than read-modified-written.
    pub async fn mark_processing(&self, job_id: &str) -> Result<(), QueueError> {
        let key = job_key(job_id);
        let now = self.clock.now();
        self.store.hset(&key, "status", JobStatus::Processing.as_str()).await?;
        self.store.hincr(&key, "attempts", 1).await?;
        self.store.hset(&key, "started_at", &repository::serialize_dt(Some(now))).await?;
        self.store.hset(&key, "updated_at", &repository::serialize_dt(Some(now))).await?;
        self.store.hset(&key, "last_error", "").await?;
        Ok(())
    }

    /// Terminal success: write `result`, then ack (remove from
    /// ProcessingList). The hash writes precede the ack so a reader never
    /// observes the id absent from ProcessingList while status is
    /// non-terminal.
    pub async fn mark_done(&self, job_id: &str, result: Value) -> Result<(), QueueError> {
        let key = job_key(job_id);
        self.store.hset(&key, "status", JobStatus::Done.as_str()).await?;
        self.store
            .hset(&key, "result", &serde_json::to_string(&result).expect("Value always serializes"))
            .await?;
        self.store
            .hset(&key, "updated_at", &repository::serialize_dt(Some(self.clock.now())))
            .await?;
        self.store
            .lrem(&self.config.processing_key, 1, job_id)
            .await?;
        info!(job_id, "job done");
        Ok(())
    }

    /// Terminal failure: symmetric to [`Queue::mark_done`] with
    /// `status=failed` and `last_error` (truncated to 1 KiB).
    pub async fn mark_failed(&self, job_id: &str, error_msg: &str) -> Result<(), QueueError> {
        let key = job_key(job_id);
        self.store.hset(&key, "status", JobStatus::Failed.as_str()).await?;
        self.store.hset(&key, "last_error", &truncate(error_msg)).await?;
        self.store
            .hset(&key, "updated_at", &repository::serialize_dt(Some(self.clock.now())))
            .await?;
        self.store
            .lrem(&self.config.processing_key, 1, job_id)
            .await?;
        warn!(job_id, error = error_msg, "job failed");
        Ok(())
    }

    /// Return a job to `queued`. The push to WaitingList precedes the
    /// removal from ProcessingList: if the process dies between the two,
    /// the job remains claimed and will be reaped again rather than
    /// dropped entirely.
    pub async fn requeue_job(&self, job_id: &str, error_msg: Option<&str>) -> Result<(), QueueError> {
        let key = job_key(job_id);
        let now = self.clock.now();
        self.store.hset(&key, "status", JobStatus::Queued.as_str()).await?;
        self.store.hset(&key, "started_at", "").await?;
        self.store.hset(&key, "updated_at", &repository::serialize_dt(Some(now))).await?;
        if let Some(msg) = error_msg {
            self.store.hset(&key, "last_error", &truncate(msg)).await?;
        }
        self.store.lpush(&self.config.queue_key, job_id).await?;
        self.store
            .lrem(&self.config.processing_key, 1, job_id)
            .await?;
        info!(job_id, "job requeued");
        Ok(())
    }

    /// Sweep ProcessingList for jobs stuck past `processing_timeout_s`
    /// and requeue or terminally fail them. Returns the number of ids
    /// acted on.
    ///
    /// Ids whose record is missing or malformed, or whose status is not
    /// `processing`, are skipped: they will be cleaned up by whoever owns
    /// them. The boundary `now - started_at == timeout` is treated as
    /// not-yet-stuck (strict `>`).
    pub async fn scan_and_requeue_stuck(&self) -> Result<u64, QueueError> {
        let ids = self
            .store
            .lrange(&self.config.processing_key, 0, -1)
            .await?;
        let now = self.clock.now();
        let mut acted = 0u64;

        for job_id in ids {
            let Some(fields) = self.store.hget_all(&job_key(&job_id)).await? else {
                continue;
            };
            let job = match repository::decode(&job_id, &fields) {
                Ok(job) => job,
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "reaper: skipping malformed record");
                    continue;
                }
            };
            if job.status != JobStatus::Processing {
                continue;
            }
            let Some(started_at) = job.started_at else {
                continue;
            };
            if now - started_at <= Duration::seconds(self.config.processing_timeout_s) {
                continue;
            }

            if job.attempts < self.config.max_attempts {
                self.requeue_job(&job_id, Some("reaper: processing timeout exceeded"))
                    .await?;
            } else {
                self.mark_failed(&job_id, "exceeded max attempts (reaper)")
                    .await?;
            }
            acted += 1;
        }

        Ok(acted)
    }
}

/// Truncate `s` to at most 1 KiB, cutting on a UTF-8 char boundary so the
/// result is never invalid UTF-8 even if it falls short of the cap.
fn truncate(s: &str) -> String {
    const MAX_BYTES: usize = 1024;
    if s.len() <= MAX_BYTES {
        return s.to_string();
    }
    let mut end = MAX_BYTES;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
