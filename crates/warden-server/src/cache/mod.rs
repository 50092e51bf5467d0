//! Cache store selection.
//!
//! ## Graceful Degradation
//!
//! If Redis is disabled or unreachable at startup, the server falls back to
//! an in-process store. Sessions then live and die with the process.

pub mod backend;

pub use backend::CacheBackend;

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use warden_auth::cache::LocalCache;

use crate::config::RedisConfig;

/// Create a cache backend based on configuration.
pub async fn create_cache_backend(config: &RedisConfig) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::new_local();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(config.connect_timeout);
    pool_config.timeouts.create = Some(config.connect_timeout);
    pool_config.timeouts.recycle = Some(config.read_timeout);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheBackend::new_local();
        }
    };

    let backend = CacheBackend::new_redis(pool, config.read_timeout, config.write_timeout);
    if backend.is_available().await {
        tracing::info!("Connected to Redis");
        backend
    } else {
        tracing::warn!("Failed to reach Redis. Falling back to local cache.");
        CacheBackend::new_local()
    }
}

/// Periodically drops expired entries from the in-process store.
///
/// Token keys carry a fresh id per session and are rarely read again after
/// they expire, so lazy eviction alone would let the map grow without bound.
/// The task exits once `shutdown_rx` observes `true`.
pub fn spawn_local_purge(
    local: LocalCache,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(interval = ?every, "local cache purge started");
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = local.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = local.len(), "purged expired cache entries");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("local cache purge stopped");
                        break;
                    }
                }
            }
        }
    })
}
