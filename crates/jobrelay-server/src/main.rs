use std::sync::Arc;

use anyhow::Context;
use jobrelay_core::{Queue, SystemClock};
use jobrelay_server::{config::Config, http, reaper, worker};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(redis_url = %config.redis_url, bind = %config.http_bind_addr, "starting jobrelay-server");

    let store = jobrelay_redis::RedisStore::connect(&config.redis_url)
        .await
        .context("failed to connect to redis")?;
    let queue = Queue::new(Arc::new(store), Arc::new(SystemClock), config.queue_config());

    let mut background = Vec::new();
    if config.start_workers_in_api {
        background.extend(worker::spawn_workers(
            queue.clone(),
            worker::default_work_fn(),
            config.worker_concurrency,
            config.worker_poll_block_s,
        ));
    }
    background.push(reaper::spawn_reaper(queue.clone(), config.reaper_interval_s));

    let app = http::router(queue);
    let listener = tokio::net::TcpListener::bind(config.http_bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_bind_addr))?;

    info!(addr = %config.http_bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    for handle in background {
        handle.abort();
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
