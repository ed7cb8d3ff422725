use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;

/// Minimum vocabulary the Queue Protocol needs from a shared key-value +
/// list store.
///
/// The atomicity of [`StoreAdapter::brpop_lpush`] is the linchpin of the
/// claim protocol: it guarantees that no job id can ever be taken off one
/// list without simultaneously appearing on the other, so a crash between
/// the two halves of a claim is impossible. Implementations must not
/// retry internally on failure; a failed call surfaces a [`StoreError`]
/// without performing a partial mutation.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Set multiple string fields on a hash, atomically. Used only to
    /// write a brand-new record; mutating an existing record goes through
    /// [`StoreAdapter::hset`]/[`StoreAdapter::hincr`] instead so no prior
    /// read of the record is ever needed.
    async fn hset_all(&self, key: &str, fields: HashMap<String, String>) -> Result<(), StoreError>;

    /// Read all fields of a hash. Returns `None` when the key does not
    /// exist (as opposed to existing with zero fields).
    async fn hget_all(&self, key: &str) -> Result<Option<HashMap<String, String>>, StoreError>;

    /// Set a single field on a hash, without touching any other field
    /// (`HSET key field value`).
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Atomically increment an integer field on a hash by `delta`,
    /// returning the field's new value (`HINCRBY key field delta`). No
    /// read of the prior value is required by the caller.
    async fn hincr(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError>;

    /// Insert `value` at the head of `list`.
    async fn lpush(&self, list: &str, value: &str) -> Result<(), StoreError>;

    /// Atomically pop one value from the tail of `src` and push it to the
    /// head of `dst`, returning that value. Blocks up to `block_seconds`
    /// if `src` is empty, or forever when `block_seconds == 0`; returns
    /// `None` on timeout.
    async fn brpop_lpush(
        &self,
        src: &str,
        dst: &str,
        block_seconds: u64,
    ) -> Result<Option<String>, StoreError>;

    /// Remove at most `count` occurrences of `value` from `list`.
    async fn lrem(&self, list: &str, count: i64, value: &str) -> Result<(), StoreError>;

    /// Snapshot-read the elements of `list` between `start` and `stop`
    /// inclusive (Redis `LRANGE` semantics; `-1` means "to the end").
    async fn lrange(&self, list: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError>;
}
