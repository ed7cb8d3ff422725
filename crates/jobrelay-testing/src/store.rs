use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use jobrelay_core::{StoreAdapter, StoreError};
use tokio::sync::Notify;

/// In-memory model of the list + hash primitives [`StoreAdapter`] needs,
/// used by unit and scenario tests in place of a live Redis instance.
///
/// Lists are `VecDeque<String>` guarded by a `std::sync::Mutex` (the
/// critical sections are synchronous and short); a [`Notify`] wakes
/// blocked `brpop_lpush` callers whenever any list is pushed to, mirroring
/// Redis's blocking-pop wakeup without needing a real event loop.
#[derive(Default)]
pub struct InMemoryStore {
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    notify: Notify,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: push `value` directly onto `list` without going
    /// through the `StoreAdapter` trait object, for seeding scenarios.
    pub fn seed_list_push_back(&self, list: &str, value: &str) {
        self.lists
            .lock()
            .unwrap()
            .entry(list.to_string())
            .or_default()
            .push_back(value.to_string());
        self.notify.notify_waiters();
    }

    /// Test helper: seed a hash directly, for constructing stuck-job
    /// fixtures whose fields wouldn't otherwise be reachable through the
    /// protocol (e.g. an artificially old `started_at`).
    pub fn seed_hash(&self, key: &str, fields: HashMap<String, String>) {
        self.hashes.lock().unwrap().insert(key.to_string(), fields);
    }

    pub fn list_contains(&self, list: &str, value: &str) -> bool {
        self.lists
            .lock()
            .unwrap()
            .get(list)
            .map(|l| l.iter().any(|v| v == value))
            .unwrap_or(false)
    }

    pub fn list_len(&self, list: &str) -> usize {
        self.lists
            .lock()
            .unwrap()
            .get(list)
            .map(|l| l.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl StoreAdapter for InMemoryStore {
    async fn hset_all(&self, key: &str, fields: HashMap<String, String>) -> Result<(), StoreError> {
        self.hashes
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        Ok(self.hashes.lock().unwrap().get(key).cloned())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.hashes
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut hashes = self.hashes.lock().unwrap();
        let fields = hashes.entry(key.to_string()).or_default();
        let current: i64 = fields
            .get(field)
            .map(|v| v.parse().unwrap_or(0))
            .unwrap_or(0);
        let updated = current + delta;
        fields.insert(field.to_string(), updated.to_string());
        Ok(updated)
    }

    async fn lpush(&self, list: &str, value: &str) -> Result<(), StoreError> {
        self.lists
            .lock()
            .unwrap()
            .entry(list.to_string())
            .or_default()
            .push_front(value.to_string());
        self.notify.notify_waiters();
        Ok(())
    }

    async fn brpop_lpush(
        &self,
        src: &str,
        dst: &str,
        block_seconds: u64,
    ) -> Result<Option<String>, StoreError> {
        const POLL_INTERVAL: Duration = Duration::from_millis(10);
        // Mirrors real Redis: a timeout of 0 means block forever, not
        // "return immediately".
        let deadline =
            (block_seconds != 0).then(|| tokio::time::Instant::now() + Duration::from_secs(block_seconds));
        loop {
            if let Some(value) = self.try_pop_push(src, dst) {
                return Ok(Some(value));
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = tokio::time::Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    POLL_INTERVAL.min(deadline - now)
                }
                None => POLL_INTERVAL,
            };
            let notified = self.notify.notified();
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn lrem(&self, list: &str, count: i64, value: &str) -> Result<(), StoreError> {
        let mut lists = self.lists.lock().unwrap();
        if let Some(l) = lists.get_mut(list) {
            let mut removed = 0i64;
            let limit = if count <= 0 { i64::MAX } else { count };
            l.retain(|v| {
                if removed < limit && v == value {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        Ok(())
    }

    async fn lrange(&self, list: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let lists = self.lists.lock().unwrap();
        let Some(l) = lists.get(list) else {
            return Ok(Vec::new());
        };
        let len = l.len() as i64;
        let norm = |i: i64| -> i64 {
            if i < 0 {
                (len + i).max(0)
            } else {
                i.min(len)
            }
        };
        let start = norm(start);
        let stop = if stop < 0 { norm(stop) } else { stop.min(len - 1) };
        if len == 0 || start > stop {
            return Ok(Vec::new());
        }
        Ok(l.iter()
            .skip(start as usize)
            .take((stop - start + 1).max(0) as usize)
            .cloned()
            .collect())
    }
}

impl InMemoryStore {
    fn try_pop_push(&self, src: &str, dst: &str) -> Option<String> {
        let mut lists = self.lists.lock().unwrap();
        let value = lists.get_mut(src).and_then(|l| l.pop_back())?;
        lists.entry(dst.to_string()).or_default().push_front(value.clone());
        Some(value)
    }
}
