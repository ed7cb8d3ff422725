use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use jobrelay_core::{Queue, QueueConfig};
use jobrelay_server::{reaper, worker};
use jobrelay_testing::{FixedClock, InMemoryStore};
use serde_json::json;

fn test_queue(store: Arc<InMemoryStore>, clock: Arc<FixedClock>, max_attempts: u32) -> Queue {
    let config = QueueConfig {
        queue_key: "jobs:queue".to_string(),
        processing_key: "jobs:processing".to_string(),
        max_attempts,
        processing_timeout_s: 10,
    };
    Queue::new(store, clock, config)
}

#[tokio::test]
async fn worker_loop_completes_a_job_end_to_end() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = test_queue(store, clock, 2);

    queue
        .create_job("job-1", json!({ "n": 1 }))
        .await
        .unwrap();

    let handles = worker::spawn_workers(queue.clone(), worker::default_work_fn(), 1, 1);

    let job = tokio::time::timeout(StdDuration::from_secs(2), async {
        loop {
            if let Some(job) = queue.get_job("job-1").await.unwrap() {
                if job.status == jobrelay_core::JobStatus::Done {
                    return job;
                }
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not complete in time");

    assert_eq!(job.status, jobrelay_core::JobStatus::Done);
    assert_eq!(job.attempts, 1);
    assert!(job.result.is_some());

    for handle in handles {
        handle.abort();
    }
}

#[tokio::test]
async fn worker_loop_drops_a_stray_claim_with_no_backing_record() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = test_queue(store.clone(), clock, 2);

    // Seed a bare id in the waiting list with no corresponding hash record.
    store.seed_list_push_back("jobs:queue", "ghost-job");

    let handles = worker::spawn_workers(queue.clone(), worker::default_work_fn(), 1, 1);

    tokio::time::timeout(StdDuration::from_secs(2), async {
        loop {
            if !store.list_contains("jobs:queue", "ghost-job")
                && !store.list_contains("jobs:processing", "ghost-job")
            {
                return;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
    })
    .await
    .expect("stray claim was not dropped in time");

    for handle in handles {
        handle.abort();
    }
}

#[tokio::test]
async fn reaper_requeues_a_job_stuck_past_its_timeout() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::starting_now());
    let queue = test_queue(store.clone(), clock.clone(), 3);

    queue.create_job("job-1", json!({})).await.unwrap();
    queue.claim(1).await.unwrap();
    queue.mark_processing("job-1").await.unwrap();

    clock.advance(Duration::seconds(11));

    let handle = reaper::spawn_reaper(queue.clone(), 1);
    tokio::time::sleep(StdDuration::from_millis(1200)).await;
    handle.abort();

    let job = queue.get_job("job-1").await.unwrap().unwrap();
    assert_eq!(job.status, jobrelay_core::JobStatus::Queued);
    assert!(store.list_contains("jobs:queue", "job-1"));
    assert!(!store.list_contains("jobs:processing", "job-1"));
}
