//! Remote template fetching.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure: the request never produced an HTTP response.
#[derive(Debug, Error)]
#[error("transport error fetching {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: String,
}

/// Raw HTTP response of a remote fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs HTTP GET against external URLs.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// [`RemoteFetcher`] on a shared reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build the client used for template downloads.
    pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(900))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let transport = |e: reqwest::Error| FetchError {
            url: url.to_string(),
            cause: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport)?;

        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}
