use std::net::SocketAddr;

use anyhow::Context;

/// Process configuration, read once from the environment at startup and
/// passed explicitly into every component — no process-wide global.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub queue_key: String,
    pub processing_key: String,
    pub processing_timeout_s: i64,
    pub max_attempts: u32,
    pub worker_poll_block_s: u64,
    pub worker_concurrency: usize,
    pub start_workers_in_api: bool,
    pub reaper_interval_s: u64,
    pub http_bind_addr: SocketAddr,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            redis_url: env_or("REDIS_URL", "redis://localhost:6379/0"),
            queue_key: env_or("QUEUE_KEY", "jobs:queue"),
            processing_key: env_or("PROCESSING_KEY", "jobs:processing"),
            processing_timeout_s: env_or("PROCESSING_TIMEOUT_S", "10")
                .parse()
                .context("PROCESSING_TIMEOUT_S must be an integer")?,
            max_attempts: env_or("MAX_ATTEMPTS", "2")
                .parse()
                .context("MAX_ATTEMPTS must be an integer")?,
            worker_poll_block_s: env_or("WORKER_POLL_BLOCK_S", "5")
                .parse()
                .context("WORKER_POLL_BLOCK_S must be an integer")?,
            worker_concurrency: env_or("WORKER_CONCURRENCY", "1")
                .parse()
                .context("WORKER_CONCURRENCY must be an integer")?,
            start_workers_in_api: env_or("START_WORKERS_IN_API", "true")
                .eq_ignore_ascii_case("true"),
            reaper_interval_s: env_or("REAPER_INTERVAL_S", "1")
                .parse()
                .context("REAPER_INTERVAL_S must be an integer")?,
            http_bind_addr: env_or("HTTP_BIND_ADDR", "0.0.0.0:8000")
                .parse()
                .context("HTTP_BIND_ADDR must be a socket address")?,
        })
    }

    pub fn queue_config(&self) -> jobrelay_core::QueueConfig {
        jobrelay_core::QueueConfig {
            queue_key: self.queue_key.clone(),
            processing_key: self.processing_key.clone(),
            max_attempts: self.max_attempts,
            processing_timeout_s: self.processing_timeout_s,
        }
    }
}
