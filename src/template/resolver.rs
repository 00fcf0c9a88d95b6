//! Cache-aside template resolution.
//!
//! Inline templates are only validated. Remote templates are looked up in
//! the cache first, fetched on a miss, validated, and written back.
//!
//! Cache failures and fetch failures are handled on separate paths: a cache
//! that errors or times out degrades to a miss (read) or a no-op (write),
//! while a failed fetch always fails the resolution.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use super::model::{Template, TemplateSource};
use super::validation::{validate, validate_bytes, TemplateInvalid};
use crate::cache::{CacheKey, CacheStore};
use crate::fetch::{FetchError, RemoteFetcher};
use crate::metrics;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(500);

/// Why a remote template could not be downloaded.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("{status}")]
    Status { status: u16 },
    #[error(transparent)]
    Transport(#[from] FetchError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    TemplateInvalid(#[from] TemplateInvalid),
    #[error("Failed to fetch template: {failure}")]
    FetchFailed {
        url: String,
        #[source]
        failure: FetchFailure,
    },
}

/// Produces validated templates from a [`TemplateSource`].
#[derive(Clone)]
pub struct TemplateResolver {
    cache: Arc<dyn CacheStore>,
    fetcher: Arc<dyn RemoteFetcher>,
    cache_ttl: Duration,
    cache_timeout: Duration,
}

impl TemplateResolver {
    pub fn new(cache: Arc<dyn CacheStore>, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self {
            cache,
            fetcher,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }

    /// TTL of entries written after a successful fetch.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Upper bound on each cache read and write.
    pub fn with_cache_timeout(mut self, cache_timeout: Duration) -> Self {
        self.cache_timeout = cache_timeout;
        self
    }

    pub async fn resolve(&self, source: TemplateSource) -> Result<Template, ResolveError> {
        match source {
            TemplateSource::Inline(value) => Ok(validate(value)?),
            TemplateSource::Remote(url) => self.resolve_remote(&url).await,
        }
    }

    async fn resolve_remote(&self, url: &str) -> Result<Template, ResolveError> {
        let key = CacheKey::for_url(url);

        if let Some(cached) = self.read_cache(&key).await {
            // A bad cache entry is surfaced, not bypassed with a re-fetch.
            return validate_bytes(&cached).map_err(|e| {
                log::error!(
                    "Cached template for {} ({}) failed validation: {}",
                    url,
                    key,
                    e
                );
                ResolveError::from(e)
            });
        }

        let body = self.fetch(url).await?;
        let template = validate_bytes(&body).map_err(|e| {
            log::warn!("Template fetched from {} failed validation: {}", url, e);
            ResolveError::from(e)
        })?;

        self.write_cache(&key, &template).await;
        Ok(template)
    }

    /// Cache read. Any store failure counts as a miss.
    async fn read_cache(&self, key: &CacheKey) -> Option<Vec<u8>> {
        match timeout(self.cache_timeout, self.cache.get(key)).await {
            Ok(Ok(Some(bytes))) => {
                metrics::record_cache_lookup("hit");
                log::debug!("Template cache hit for {}", key);
                Some(bytes)
            }
            Ok(Ok(None)) => {
                metrics::record_cache_lookup("miss");
                None
            }
            Ok(Err(e)) => {
                metrics::record_cache_lookup("error");
                log::warn!("Template cache read failed, falling back to fetch: {}", e);
                None
            }
            Err(_) => {
                metrics::record_cache_lookup("timeout");
                log::warn!(
                    "Template cache read timed out after {:?}, falling back to fetch",
                    self.cache_timeout
                );
                None
            }
        }
    }

    /// Cache write. Failures are logged and dropped.
    async fn write_cache(&self, key: &CacheKey, template: &Template) {
        let bytes = template.to_bytes();
        match timeout(self.cache_timeout, self.cache.set(key, &bytes, self.cache_ttl)).await {
            Ok(Ok(())) => metrics::record_cache_write("ok"),
            Ok(Err(e)) => {
                metrics::record_cache_write("error");
                log::warn!("Template cache write failed: {}", e);
            }
            Err(_) => {
                metrics::record_cache_write("timeout");
                log::warn!("Template cache write timed out after {:?}", self.cache_timeout);
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResolveError> {
        let response = self.fetcher.get(url).await.map_err(|e| {
            metrics::record_fetch("transport");
            ResolveError::FetchFailed {
                url: url.to_string(),
                failure: FetchFailure::Transport(e),
            }
        })?;

        if !response.is_success() {
            metrics::record_fetch("status");
            return Err(ResolveError::FetchFailed {
                url: url.to_string(),
                failure: FetchFailure::Status {
                    status: response.status,
                },
            });
        }

        metrics::record_fetch("ok");
        Ok(response.body)
    }
}
