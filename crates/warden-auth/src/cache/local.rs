//! In-process cache store.
//!
//! Used when no shared store is configured and in tests. Expired entries are
//! evicted lazily on access or in bulk via [`LocalCache::purge_expired`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::{CacheError, CacheResult, CacheStore};

#[derive(Debug, Clone)]
enum LocalValue {
    Bytes(Vec<u8>),
    Hash(HashMap<String, Vec<u8>>),
}

#[derive(Debug, Clone)]
struct LocalEntry {
    value: LocalValue,
    expires_at: Option<Instant>,
}

impl LocalEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// `DashMap`-backed [`CacheStore`].
#[derive(Debug, Clone, Default)]
pub struct LocalCache {
    entries: Arc<DashMap<String, LocalEntry>>,
}

impl LocalCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remaining lifetime of a key, if it is live and has an expiry.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    fn evict_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn wrong_type(key: &str) -> CacheError {
        CacheError::WrongType {
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl CacheStore for LocalCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.evict_if_expired(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                LocalValue::Bytes(bytes) => Ok(Some(bytes.clone())),
                LocalValue::Hash(_) => Err(Self::wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            LocalEntry {
                value: LocalValue::Bytes(value.to_vec()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<Vec<u8>>> {
        self.evict_if_expired(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                LocalValue::Hash(fields) => Ok(fields.get(field).cloned()),
                LocalValue::Bytes(_) => Err(Self::wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn hset_expire_nx(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl: Duration,
    ) -> CacheResult<()> {
        self.evict_if_expired(key);
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| LocalEntry {
                value: LocalValue::Hash(HashMap::new()),
                expires_at: None,
            });

        match &mut entry.value {
            LocalValue::Hash(fields) => {
                fields.insert(field.to_string(), value.to_vec());
            }
            LocalValue::Bytes(_) => return Err(Self::wrong_type(key)),
        }

        if entry.expires_at.is_none() {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.evict_if_expired(key);
        Ok(self.entries.contains_key(key))
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let cache = LocalCache::new();
        cache
            .set_ex("k", b"v", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(cache.exists("k").await.unwrap());
        assert!(cache.del("k").await.unwrap());
        assert!(!cache.del("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = LocalCache::new();
        cache
            .set_ex("k", b"v", Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(!cache.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hash_bucket_keeps_first_ttl() {
        let cache = LocalCache::new();
        cache
            .hset_expire_nx("bucket", "A", b"true", Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        cache
            .hset_expire_nx("bucket", "B", b"false", Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(
            cache.hget("bucket", "B").await.unwrap(),
            Some(b"false".to_vec())
        );
        let remaining = cache.ttl("bucket").unwrap();
        assert!(remaining <= Duration::from_secs(4));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.hget("bucket", "A").await.unwrap(), None);
        assert_eq!(cache.hget("bucket", "B").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let cache = LocalCache::new();
        cache
            .set_ex("k", b"v", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(matches!(
            cache.hget("k", "f").await,
            Err(CacheError::WrongType { .. })
        ));
        assert!(
            cache
                .hset_expire_nx("k", "f", b"x", Duration::from_secs(60))
                .await
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = LocalCache::new();
        cache.set_ex("a", b"1", Duration::from_secs(1)).await.unwrap();
        cache.set_ex("b", b"2", Duration::from_secs(100)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
