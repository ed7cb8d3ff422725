//! The Reaper Loop: periodically sweeps ProcessingList for jobs stuck past
//! their processing timeout.

use jobrelay_core::Queue;
use tracing::{info, warn};

/// Spawn the reaper task, ticking every `interval_s` seconds.
pub fn spawn_reaper(queue: Queue, interval_s: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { reaper_loop(queue, interval_s).await })
}

async fn reaper_loop(queue: Queue, interval_s: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_s));
    loop {
        ticker.tick().await;
        match queue.scan_and_requeue_stuck().await {
            Ok(0) => {}
            Ok(n) => info!(reclaimed = n, "reaper reclaimed stuck jobs"),
            Err(e) => warn!(error = %e, "reaper sweep failed"),
        }
    }
}
