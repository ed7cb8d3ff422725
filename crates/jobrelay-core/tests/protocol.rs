use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use jobrelay_core::{JobStatus, Queue, QueueConfig};
use jobrelay_testing::{FixedClock, InMemoryStore};
use serde_json::json;

fn new_queue(store: Arc<InMemoryStore>, clock: Arc<FixedClock>) -> Queue {
    Queue::new(
        store,
        clock,
        QueueConfig {
            queue_key: "jobs:queue".to_string(),
            processing_key: "jobs:processing".to_string(),
            max_attempts: 2,
            processing_timeout_s: 10,
        },
    )
}

#[tokio::test]
async fn happy_path_create_claim_process_done() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store.clone(), clock.clone());

    queue.create_job("job-1", json!({"x": 1})).await.unwrap();

    let job = queue.get_job("job-1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.attempts, 0);
    assert!(store.list_contains("jobs:queue", "job-1"));

    let claimed = queue.claim(1).await.unwrap().unwrap();
    assert_eq!(claimed, "job-1");
    assert!(!store.list_contains("jobs:queue", "job-1"));
    assert!(store.list_contains("jobs:processing", "job-1"));

    queue.mark_processing("job-1").await.unwrap();
    let job = queue.get_job("job-1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.attempts, 1);
    assert!(job.started_at.is_some());

    queue
        .mark_done("job-1", json!({"processed": true, "original": {"x": 1}}))
        .await
        .unwrap();

    let job = queue.get_job("job-1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.attempts, 1);
    assert!(job.last_error.is_none());
    assert_eq!(job.result, Some(json!({"processed": true, "original": {"x": 1}})));
    assert!(!store.list_contains("jobs:processing", "job-1"));
    assert!(!store.list_contains("jobs:queue", "job-1"));
}

#[tokio::test]
async fn claim_times_out_when_queue_empty() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store, clock);

    // block_seconds=0 means "block forever" (matching real Redis), so a
    // short positive timeout is used here to observe the timeout path.
    let claimed = queue.claim(1).await.unwrap();
    assert!(claimed.is_none());
}

#[tokio::test]
async fn work_failure_under_retry_then_success_clears_last_error() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store, clock);

    queue.create_job("job-2", json!({"slow": true})).await.unwrap();
    let claimed = queue.claim(1).await.unwrap().unwrap();
    queue.mark_processing(&claimed).await.unwrap();

    let job = queue.get_job(&claimed).await.unwrap().unwrap();
    assert_eq!(job.attempts, 1);
    queue
        .requeue_job(&claimed, Some("transient failure"))
        .await
        .unwrap();

    let job = queue.get_job(&claimed).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.last_error.as_deref(), Some("transient failure"));
    assert!(job.started_at.is_none());

    let claimed_again = queue.claim(1).await.unwrap().unwrap();
    assert_eq!(claimed_again, "job-2");
    queue.mark_processing(&claimed_again).await.unwrap();

    let job = queue.get_job(&claimed_again).await.unwrap().unwrap();
    assert_eq!(job.attempts, 2);
    assert!(job.last_error.is_none(), "last_error clears on re-entry to processing");

    queue
        .mark_done(&claimed_again, json!({"processed": true}))
        .await
        .unwrap();
    let job = queue.get_job("job-2").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.attempts, 2);
}

#[tokio::test]
async fn terminal_failure_after_max_attempts() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store.clone(), clock);

    queue.create_job("job-3", json!({})).await.unwrap();

    for _ in 0..2 {
        let claimed = queue.claim(1).await.unwrap().unwrap();
        queue.mark_processing(&claimed).await.unwrap();
        let job = queue.get_job(&claimed).await.unwrap().unwrap();
        if job.attempts < 2 {
            queue.requeue_job(&claimed, Some("boom")).await.unwrap();
        } else {
            queue.mark_failed(&claimed, "boom final").await.unwrap();
        }
    }

    let job = queue.get_job("job-3").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 2);
    assert_eq!(job.last_error.as_deref(), Some("boom final"));
    assert!(!store.list_contains("jobs:processing", "job-3"));
    assert!(!store.list_contains("jobs:queue", "job-3"));
}

#[tokio::test]
async fn reaper_requeues_stuck_job_under_attempt_cap() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store.clone(), clock.clone());

    queue.create_job("job-4", json!({})).await.unwrap();
    let claimed = queue.claim(1).await.unwrap().unwrap();
    queue.mark_processing(&claimed).await.unwrap();

    clock.advance(Duration::seconds(11));

    let acted = queue.scan_and_requeue_stuck().await.unwrap();
    assert_eq!(acted, 1);

    let job = queue.get_job("job-4").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.started_at.is_none());
    assert!(store.list_contains("jobs:queue", "job-4"));
    assert!(!store.list_contains("jobs:processing", "job-4"));
}

#[tokio::test]
async fn reaper_terminally_fails_stuck_job_at_attempt_cap() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store.clone(), clock.clone());

    let job_id = "job-5";
    let now = clock.now();
    // Seed a job that is already on its second (final) attempt.
    let mut fields = HashMap::new();
    fields.insert("status".to_string(), "processing".to_string());
    fields.insert("payload".to_string(), "{}".to_string());
    fields.insert("result".to_string(), "".to_string());
    fields.insert("last_error".to_string(), "".to_string());
    fields.insert("attempts".to_string(), "2".to_string());
    fields.insert("created_at".to_string(), now.to_rfc3339());
    fields.insert("updated_at".to_string(), now.to_rfc3339());
    fields.insert("started_at".to_string(), now.to_rfc3339());
    store.seed_hash(&jobrelay_core::job_key(job_id), fields);
    store.seed_list_push_back("jobs:processing", job_id);

    clock.advance(Duration::seconds(11));

    let acted = queue.scan_and_requeue_stuck().await.unwrap();
    assert_eq!(acted, 1);

    let job = queue.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.last_error.as_deref(), Some("exceeded max attempts (reaper)"));
    assert!(!store.list_contains("jobs:processing", job_id));
    assert!(!store.list_contains("jobs:queue", job_id));
}

#[tokio::test]
async fn reaper_boundary_timestamp_is_not_yet_stuck() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store.clone(), clock.clone());

    queue.create_job("job-6", json!({})).await.unwrap();
    let claimed = queue.claim(1).await.unwrap().unwrap();
    queue.mark_processing(&claimed).await.unwrap();

    clock.advance(Duration::seconds(10));

    let acted = queue.scan_and_requeue_stuck().await.unwrap();
    assert_eq!(acted, 0, "exact timeout boundary is not yet stuck");

    let job = queue.get_job("job-6").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
}

#[tokio::test]
async fn reaper_skips_ids_with_missing_record() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store.clone(), clock.clone());

    store.seed_list_push_back("jobs:processing", "ghost-job");

    let acted = queue.scan_and_requeue_stuck().await.unwrap();
    assert_eq!(acted, 0);
    assert!(store.list_contains("jobs:processing", "ghost-job"));
}

#[tokio::test]
async fn get_job_returns_none_for_unknown_id() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store, clock);

    assert!(queue.get_job("does-not-exist").await.unwrap().is_none());
}

#[tokio::test]
async fn terminal_state_is_stable_under_a_further_requeue_attempt() {
    // mark_done/mark_failed remove the job from ProcessingList, so a
    // second scan of ProcessingList will never observe it again: the
    // reaper cannot re-touch a terminal job through its normal sweep.
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = new_queue(store.clone(), clock.clone());

    queue.create_job("job-7", json!({})).await.unwrap();
    let claimed = queue.claim(1).await.unwrap().unwrap();
    queue.mark_processing(&claimed).await.unwrap();
    queue.mark_done(&claimed, json!({"ok": true})).await.unwrap();

    clock.advance(Duration::seconds(100));
    let acted = queue.scan_and_requeue_stuck().await.unwrap();
    assert_eq!(acted, 0);

    let job = queue.get_job("job-7").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.result, Some(json!({"ok": true})));
}
