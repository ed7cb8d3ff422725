//! The Worker Loop: blocking claim -> process -> terminal-or-requeue.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use jobrelay_core::Queue;
use serde_json::Value;
use tracing::{error, info, warn};

/// The injected work function: takes a job's payload, returns a result or
/// an error message. Potentially slow, potentially erroring, potentially
/// never returning — a crash of the process while this future is
/// in-flight is handled by the Reaper Loop, not the Worker Loop itself.
pub type WorkFn =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send>> + Send + Sync>;

/// Spawn `concurrency` worker tasks, each running [`worker_loop`] forever.
/// Returns their join handles so the caller can await or abort them on
/// shutdown.
pub fn spawn_workers(
    queue: Queue,
    work_fn: WorkFn,
    concurrency: usize,
    poll_block_s: u64,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..concurrency)
        .map(|worker_id| {
            let queue = queue.clone();
            let work_fn = work_fn.clone();
            tokio::spawn(async move { worker_loop(worker_id, queue, work_fn, poll_block_s).await })
        })
        .collect()
}

async fn worker_loop(worker_id: usize, queue: Queue, work_fn: WorkFn, poll_block_s: u64) {
    loop {
        let job_id = match queue.claim(poll_block_s).await {
            Ok(Some(id)) => id,
            Ok(None) => continue,
            Err(e) => {
                warn!(worker_id, error = %e, "claim failed, retrying next tick");
                continue;
            }
        };

        let Some(job) = (match queue.get_job(&job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(worker_id, job_id, error = %e, "get_job failed after claim");
                None
            }
        }) else {
            warn!(worker_id, job_id, "claimed id has no backing record, dropping stray claim");
            if let Err(e) = queue.drop_stray_claim(&job_id).await {
                warn!(worker_id, job_id, error = %e, "failed to drop stray claim");
            }
            continue;
        };

        if let Err(e) = queue.mark_processing(&job_id).await {
            warn!(worker_id, job_id, error = %e, "mark_processing failed");
            continue;
        }

        info!(worker_id, job_id, attempts = job.attempts + 1, "processing job");
        let outcome = work_fn(job.payload.clone()).await;

        let max_attempts = queue.config().max_attempts;
        match outcome {
            Ok(result) => {
                if let Err(e) = queue.mark_done(&job_id, result).await {
                    error!(worker_id, job_id, error = %e, "mark_done failed");
                }
            }
            Err(err_text) => {
                // attempts already reflects this attempt (mark_processing
                // incremented it), so compare against the cap directly.
                let attempts_after = job.attempts + 1;
                if attempts_after < max_attempts {
                    if let Err(e) = queue.requeue_job(&job_id, Some(&err_text)).await {
                        error!(worker_id, job_id, error = %e, "requeue_job failed");
                    }
                } else if let Err(e) = queue.mark_failed(&job_id, &err_text).await {
                    error!(worker_id, job_id, error = %e, "mark_failed failed");
                }
            }
        }
    }
}

/// The default work function, matching the distilled source's
/// `process_job`: a brief simulated delay, then an echo of the payload.
pub fn default_work_fn() -> WorkFn {
    Arc::new(|payload: Value| {
        Box::pin(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(serde_json::json!({ "processed": true, "original": payload }))
        })
    })
}
