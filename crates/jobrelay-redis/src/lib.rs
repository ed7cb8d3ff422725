//! Redis implementation of [`jobrelay_core::StoreAdapter`], backed by
//! `redis::aio::ConnectionManager` (an auto-reconnecting, multiplexed
//! connection safe to share across every Worker Loop task, the Reaper
//! Loop, and the HTTP Facade).

use std::collections::HashMap;

use async_trait::async_trait;
use jobrelay_core::{StoreAdapter, StoreError};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

/// A [`StoreAdapter`] backed by a live Redis connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `redis_url` and build the connection manager.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }
}

fn to_store_error(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl StoreAdapter for RedisStore {
    async fn hset_all(&self, key: &str, fields: HashMap<String, String>) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let pairs: Vec<(String, String)> = fields.into_iter().collect();
        let _: () = conn.hset_multiple(key, &pairs).await.map_err(|e| {
            warn!(key, error = %e, "HSET failed");
            to_store_error(e)
        })?;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await.map_err(|e| {
            warn!(key, error = %e, "HGETALL failed");
            to_store_error(e)
        })?;
        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fields))
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, field, value).await.map_err(|e| {
            warn!(key, field, error = %e, "HSET failed");
            to_store_error(e)
        })?;
        Ok(())
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.hincr(key, field, delta).await.map_err(|e| {
            warn!(key, field, error = %e, "HINCRBY failed");
            to_store_error(e)
        })
    }

    async fn lpush(&self, list: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(list, value).await.map_err(|e| {
            warn!(list, error = %e, "LPUSH failed");
            to_store_error(e)
        })?;
        Ok(())
    }

    async fn brpop_lpush(
        &self,
        src: &str,
        dst: &str,
        block_seconds: u64,
    ) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(src)
            .arg(dst)
            .arg(block_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(src, dst, error = %e, "BRPOPLPUSH failed");
                to_store_error(e)
            })?;
        Ok(value)
    }

    async fn lrem(&self, list: &str, count: i64, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lrem(list, count, value).await.map_err(|e| {
            warn!(list, error = %e, "LREM failed");
            to_store_error(e)
        })?;
        Ok(())
    }

    async fn lrange(&self, list: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.lrange(list, start as isize, stop as isize)
            .await
            .map_err(|e| {
                warn!(list, error = %e, "LRANGE failed");
                to_store_error(e)
            })
    }
}
