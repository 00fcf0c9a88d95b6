//! In-process cache store backed by moka.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CacheError, CacheKey, CacheStore};

const DEFAULT_MAX_ENTRIES: u64 = 1_000;

#[derive(Clone)]
struct CachedBlob {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedBlob> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedBlob,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedBlob,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Cache store living inside the server process.
///
/// Used when no Redis instance is configured. Entries are not shared between
/// server replicas.
#[derive(Clone)]
pub struct MemoryCacheStore {
    cache: Cache<String, CachedBlob>,
}

impl MemoryCacheStore {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self
            .cache
            .get(key.as_str())
            .await
            .map(|blob| blob.bytes.to_vec()))
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let blob = CachedBlob {
            bytes: Arc::from(value),
            ttl,
        };
        self.cache.insert(key.as_str().to_string(), blob).await;
        Ok(())
    }
}
