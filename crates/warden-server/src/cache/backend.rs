//! Cache store backed by Redis or by the in-process `LocalCache`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use warden_auth::cache::{CacheError, CacheResult, CacheStore, LocalCache};

/// Where entity lookups and session tokens are kept.
///
/// ## Cache Modes
///
/// - **Local**: Single-instance mode, one `DashMap` per process
/// - **Redis**: Multi-instance mode, every instance shares one keyspace
///
/// Token validity lives in this store, so instances behind one load
/// balancer must use Redis mode for logout and refresh to take effect
/// everywhere.
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: in-process store only
    Local(LocalCache),

    /// Multi-instance: shared Redis
    Redis {
        pool: Pool,
        read_timeout: Duration,
        write_timeout: Duration,
    },
}

impl CacheBackend {
    /// Create a new local-only cache backend.
    pub fn new_local() -> Self {
        CacheBackend::Local(LocalCache::new())
    }

    /// Create a new Redis-backed cache backend.
    pub fn new_redis(pool: Pool, read_timeout: Duration, write_timeout: Duration) -> Self {
        CacheBackend::Redis {
            pool,
            read_timeout,
            write_timeout,
        }
    }

    /// Backend name for logs and health output.
    pub fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis { .. } => "redis",
        }
    }

    /// Check if the backend can serve requests (for health checks).
    pub async fn is_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => true,
            CacheBackend::Redis { pool, .. } => match pool.get().await {
                Ok(mut conn) => {
                    let pong: redis::RedisResult<String> =
                        redis::cmd("PING").query_async(&mut conn).await;
                    pong.is_ok()
                }
                Err(_) => false,
            },
        }
    }

    async fn connection(pool: &Pool) -> CacheResult<deadpool_redis::Connection> {
        pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to get Redis connection");
            CacheError::backend(e.to_string())
        })
    }
}

/// Runs a Redis command under `limit`, mapping errors into `CacheError`.
async fn run<T, F>(key: &str, limit: Duration, command: F) -> CacheResult<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(limit, command).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) if e.code() == Some("WRONGTYPE") => Err(CacheError::WrongType {
            key: key.to_string(),
        }),
        Ok(Err(e)) => {
            tracing::warn!(key = %key, error = %e, "Redis command failed");
            Err(CacheError::backend(e.to_string()))
        }
        Err(_) => {
            tracing::warn!(key = %key, timeout = ?limit, "Redis command timed out");
            Err(CacheError::backend(format!("timed out after {limit:?}")))
        }
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStore for CacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        match self {
            CacheBackend::Local(local) => local.get(key).await,
            CacheBackend::Redis {
                pool, read_timeout, ..
            } => {
                let mut conn = Self::connection(pool).await?;
                run(key, *read_timeout, conn.get::<_, Option<Vec<u8>>>(key)).await
            }
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        match self {
            CacheBackend::Local(local) => local.set_ex(key, value, ttl).await,
            CacheBackend::Redis {
                pool,
                write_timeout,
                ..
            } => {
                let mut conn = Self::connection(pool).await?;
                run(
                    key,
                    *write_timeout,
                    conn.pset_ex::<_, _, ()>(key, value, millis(ttl)),
                )
                .await?;
                tracing::debug!(key = %key, ttl = ?ttl, "cache set");
                Ok(())
            }
        }
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<Vec<u8>>> {
        match self {
            CacheBackend::Local(local) => local.hget(key, field).await,
            CacheBackend::Redis {
                pool, read_timeout, ..
            } => {
                let mut conn = Self::connection(pool).await?;
                run(
                    key,
                    *read_timeout,
                    conn.hget::<_, _, Option<Vec<u8>>>(key, field),
                )
                .await
            }
        }
    }

    async fn hset_expire_nx(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl: Duration,
    ) -> CacheResult<()> {
        match self {
            CacheBackend::Local(local) => local.hset_expire_nx(key, field, value, ttl).await,
            CacheBackend::Redis {
                pool,
                write_timeout,
                ..
            } => {
                let mut conn = Self::connection(pool).await?;
                // MULTI/EXEC so the field never lands without an expiry.
                let mut pipe = redis::pipe();
                pipe.atomic()
                    .hset(key, field, value)
                    .ignore()
                    .cmd("PEXPIRE")
                    .arg(key)
                    .arg(millis(ttl))
                    .arg("NX")
                    .ignore();
                run(key, *write_timeout, async {
                    let reply: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
                    reply
                })
                .await
            }
        }
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        match self {
            CacheBackend::Local(local) => local.exists(key).await,
            CacheBackend::Redis {
                pool, read_timeout, ..
            } => {
                let mut conn = Self::connection(pool).await?;
                run(key, *read_timeout, conn.exists::<_, bool>(key)).await
            }
        }
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        match self {
            CacheBackend::Local(local) => local.del(key).await,
            CacheBackend::Redis {
                pool,
                write_timeout,
                ..
            } => {
                let mut conn = Self::connection(pool).await?;
                let removed = run(key, *write_timeout, conn.del::<_, i64>(key)).await?;
                tracing::debug!(key = %key, removed, "cache invalidated");
                Ok(removed > 0)
            }
        }
    }
}
