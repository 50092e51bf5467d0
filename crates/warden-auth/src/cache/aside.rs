//! Cache-aside helper.
//!
//! Reads consult the cache first and fall back to the source of truth on a
//! miss; writes invalidate rather than update. Cache failures never reach the
//! caller: a failed read is a miss and a failed write or delete is logged.
//!
//! Entity values are stored inside a tagged envelope so that a cached
//! "confirmed absent" marker is never confused with a decode failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::CacheStore;
use crate::AuthResult;

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    /// A value was cached.
    Hit(T),
    /// A not-found marker was cached: the source confirmed absence.
    Absent,
    /// Nothing usable was cached.
    Miss,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
enum Envelope<T> {
    Found(T),
    Missing,
}

/// Shared cache-aside primitives with a fixed TTL policy.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CacheAside {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reads an entity envelope.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> CacheLookup<T> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return CacheLookup::Miss,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, falling through");
                return CacheLookup::Miss;
            }
        };

        match serde_json::from_slice::<Envelope<T>>(&bytes) {
            Ok(Envelope::Found(value)) => CacheLookup::Hit(value),
            Ok(Envelope::Missing) => CacheLookup::Absent,
            Err(e) => {
                warn!(key = %key, error = %e, "undecodable cache entry, falling through");
                CacheLookup::Miss
            }
        }
    }

    /// Caches a value, or a not-found marker for `None`.
    pub async fn remember<T: Serialize>(&self, key: &str, value: Option<&T>) {
        let envelope = match value {
            Some(value) => Envelope::Found(value),
            None => Envelope::Missing,
        };
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set_ex(key, &bytes, self.ttl).await {
            warn!(key = %key, error = %e, "cache write failed");
        }
    }

    /// Reads one field of a hash bucket.
    pub async fn lookup_field<T: DeserializeOwned>(&self, bucket: &str, field: &str) -> Option<T> {
        match self.store.hget(bucket, field).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key = %bucket, field = %field, error = %e, "undecodable cache field");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %bucket, field = %field, error = %e, "cache read failed, falling through");
                None
            }
        }
    }

    /// Writes one field of a hash bucket. The bucket's TTL is set only when it
    /// has none, so later fields do not extend the bucket's lifetime.
    pub async fn remember_field<T: Serialize>(&self, bucket: &str, field: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %bucket, field = %field, error = %e, "failed to encode cache field");
                return;
            }
        };
        if let Err(e) = self
            .store
            .hset_expire_nx(bucket, field, &bytes, self.ttl)
            .await
        {
            warn!(key = %bucket, field = %field, error = %e, "cache write failed");
        }
    }

    /// Deletes every key, logging individual failures.
    pub async fn invalidate(&self, keys: &[String]) {
        for key in keys {
            match self.store.del(key).await {
                Ok(_) => debug!(key = %key, "cache entry invalidated"),
                Err(e) => warn!(key = %key, error = %e, "cache invalidation failed"),
            }
        }
    }

    /// Cache-aside read of an optional entity.
    ///
    /// A cached not-found marker short-circuits to `Ok(None)` without calling
    /// `load`. Source errors are logged with the key and propagated uncached.
    pub async fn read_through<T, F, Fut>(&self, key: &str, load: F) -> AuthResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AuthResult<Option<T>>>,
    {
        match self.lookup::<T>(key).await {
            CacheLookup::Hit(value) => return Ok(Some(value)),
            CacheLookup::Absent => return Ok(None),
            CacheLookup::Miss => {}
        }

        let loaded = load().await.inspect_err(|e| {
            error!(key = %key, error = %e, "source lookup failed");
        })?;
        self.remember(key, loaded.as_ref()).await;
        Ok(loaded)
    }
}

impl std::fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthError;
    use crate::cache::{CacheError, CacheResult, LocalCache};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        name: String,
    }

    fn item() -> Item {
        Item {
            id: "1".to_string(),
            name: "one".to_string(),
        }
    }

    fn helper() -> (CacheAside, LocalCache) {
        let local = LocalCache::new();
        (
            CacheAside::new(Arc::new(local.clone()), Duration::from_secs(60)),
            local,
        )
    }

    /// Store whose every command fails.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::backend("down"))
        }
        async fn set_ex(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::backend("down"))
        }
        async fn hget(&self, _key: &str, _field: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::backend("down"))
        }
        async fn hset_expire_nx(
            &self,
            _key: &str,
            _field: &str,
            _value: &[u8],
            _ttl: Duration,
        ) -> CacheResult<()> {
            Err(CacheError::backend("down"))
        }
        async fn exists(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::backend("down"))
        }
        async fn del(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::backend("down"))
        }
    }

    #[tokio::test]
    async fn test_tri_state_lookup() {
        let (cache, _) = helper();

        assert_eq!(cache.lookup::<Item>("k").await, CacheLookup::Miss);

        cache.remember::<Item>("k", None).await;
        assert_eq!(cache.lookup::<Item>("k").await, CacheLookup::Absent);

        cache.remember("k", Some(&item())).await;
        assert_eq!(cache.lookup::<Item>("k").await, CacheLookup::Hit(item()));
    }

    #[tokio::test]
    async fn test_foreign_bytes_are_a_miss() {
        let (cache, local) = helper();
        local
            .set_ex("k", b"nil", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.lookup::<Item>("k").await, CacheLookup::Miss);
    }

    #[tokio::test]
    async fn test_read_through_caches_both_outcomes() {
        let (cache, _) = helper();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let found = cache
                .read_through("present", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(item()))
                })
                .await
                .unwrap();
            assert_eq!(found, Some(item()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        for _ in 0..3 {
            let found = cache
                .read_through::<Item, _, _>("absent", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert_eq!(found, None);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_read_through_does_not_cache_errors() {
        let (cache, local) = helper();

        let result = cache
            .read_through::<Item, _, _>("k", || async { Err(AuthError::storage("db down")) })
            .await;
        assert!(result.is_err());
        assert!(local.is_empty());
    }

    #[tokio::test]
    async fn test_broken_store_falls_through() {
        let cache = CacheAside::new(Arc::new(BrokenStore), Duration::from_secs(60));

        let found = cache
            .read_through("k", || async { Ok(Some(item())) })
            .await
            .unwrap();
        assert_eq!(found, Some(item()));

        assert_eq!(cache.lookup_field::<bool>("bucket", "f").await, None);
        cache.remember_field("bucket", "f", &true).await;
        cache.invalidate(&["a".to_string(), "b".to_string()]).await;
    }

    #[tokio::test]
    async fn test_fields_and_invalidate() {
        let (cache, local) = helper();
        cache.remember_field("bucket", "GROUP_READ", &true).await;
        cache.remember_field("bucket", "GROUP_DELETE", &false).await;

        assert_eq!(
            cache.lookup_field::<bool>("bucket", "GROUP_READ").await,
            Some(true)
        );
        assert_eq!(
            cache.lookup_field::<bool>("bucket", "GROUP_DELETE").await,
            Some(false)
        );
        assert_eq!(cache.lookup_field::<bool>("bucket", "OTHER").await, None);

        cache.invalidate(&["bucket".to_string()]).await;
        assert!(local.is_empty());
    }
}
