//! Key-value store abstraction and the cache-aside helper built on it.
//!
//! - [`CacheStore`] - async key-value primitives (strings and hash buckets)
//! - [`LocalCache`] - in-process store backed by `DashMap`
//! - [`CacheAside`] - read-through/write-invalidate helper used by repositories
//! - [`keys`] - the key namespace shared by every instance of the service

pub mod aside;
pub mod keys;
pub mod local;

use std::time::Duration;

use async_trait::async_trait;

pub use aside::{CacheAside, CacheLookup};
pub use local::LocalCache;

/// Errors reported by a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command.
    #[error("cache backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// A string operation hit a hash bucket or the other way around.
    #[error("wrong value type at key {key}")]
    WrongType {
        /// The offending key.
        key: String,
    },
}

impl CacheError {
    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Async key-value store with per-key expiry and hash buckets.
///
/// Implementations must be safe for concurrent use from many requests.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a string value.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Writes a string value that expires after `ttl`.
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Reads one field of a hash bucket.
    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Writes one field of a hash bucket and applies `ttl` to the bucket only
    /// if it has no expiry yet.
    async fn hset_expire_nx(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl: Duration,
    ) -> CacheResult<()>;

    /// Returns `true` if the key holds a live value of any type.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Deletes a key. Returns `true` if something was removed.
    async fn del(&self, key: &str) -> CacheResult<bool>;
}
