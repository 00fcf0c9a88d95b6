//! Redis-backed cache store.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{CacheError, CacheKey, CacheStore};

/// Cache store on a shared Redis instance.
///
/// One multiplexed connection is shared by all requests. It is opened on first
/// use and dropped after a failed command so the next call reconnects, which
/// lets the server start and keep serving while Redis is down.
pub struct RedisCacheStore {
    client: redis::Client,
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisCacheStore {
    /// Create a store from a Redis URL. Does not connect yet.
    pub fn from_url(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Unavailable(format!("invalid Redis URL: {e}")))?;
        Ok(Self {
            client,
            connection: RwLock::new(None),
        })
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection, CacheError> {
        if let Some(con) = self.connection.read().await.as_ref() {
            return Ok(con.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(con) = slot.as_ref() {
            return Ok(con.clone());
        }

        let con = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Unavailable(format!("Redis connection error: {e}")))?;
        log::info!("Connected to Redis template cache");
        *slot = Some(con.clone());
        Ok(con)
    }

    async fn reset_connection(&self) {
        self.connection.write().await.take();
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let mut con = self.get_connection().await?;

        match con.get::<_, Option<Vec<u8>>>(key.as_str()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.reset_connection().await;
                Err(CacheError::Command(format!("Redis GET error: {e}")))
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut con = self.get_connection().await?;
        let seconds = ttl.as_secs().max(1);

        match con.set_ex::<_, _, ()>(key.as_str(), value, seconds).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.reset_connection().await;
                Err(CacheError::Command(format!("Redis SET error: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RedisCacheStore::from_url("not a redis url");
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_unavailable() {
        // Port 1 on loopback refuses connections
        let store = RedisCacheStore::from_url("redis://127.0.0.1:1/").unwrap();
        let key = CacheKey::for_url("https://example.com/t.json");

        assert!(store.get(&key).await.is_err());
        assert!(store
            .set(&key, b"{}", Duration::from_secs(10))
            .await
            .is_err());
    }
}
