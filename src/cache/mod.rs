//! Template cache store abstraction.
//!
//! The resolver only ever talks to [`CacheStore`]; the concrete store is picked
//! at startup:
//! - `RedisCacheStore` - shared Redis instance, used when `REDIS_URL` is set
//! - `MemoryCacheStore` - in-process moka cache, used otherwise

pub mod memory;
pub mod redis_store;

pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Prefix of every template cache key.
pub const CACHE_KEY_PREFIX: &str = "pdfme:template:";

/// Store-level failure. Never surfaced to clients.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache command failed: {0}")]
    Command(String),
}

/// Cache key derived from a template URL.
///
/// The URL is hashed verbatim; no canonicalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_url(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        Self(format!("{}{}", CACHE_KEY_PREFIX, hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value store with per-entry TTL.
///
/// Writes replace the whole value. Implementations must be safe to share
/// across concurrent requests without external locking.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value for `key`; `Ok(None)` is a miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError>;
}
