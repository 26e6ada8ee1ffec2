//! Remote track resolution
//!
//! The mixing core never touches the network. Tracks that arrive as URLs are
//! resolved here, before mixing, by a `TrackFetcher`:
//! - `HttpFetcher`: reqwest client with timeout and bounded retry
//! - `CachedFetcher`: wraps any fetcher with an explicit `SampleCache`

use crate::config::FetchSettings;
use async_trait::async_trait;
use epmix_common::SampleCache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("epmix/", env!("CARGO_PKG_VERSION"));

/// Fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchError {
    /// Transport failures, throttling, and server errors are worth retrying
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Client(_) | FetchError::Exhausted { .. } => false,
        }
    }
}

/// Resolves a remote track reference into encoded bytes
#[async_trait]
pub trait TrackFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) fetcher with per-request timeout and bounded retry
pub struct HttpFetcher {
    http_client: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            max_attempts: settings.max_attempts.max(1),
            retry_delay: settings.retry_delay(),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TrackFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.fetch_once(url).await {
                Ok(bytes) => {
                    debug!(url, attempt, bytes = bytes.len(), "Fetched remote track");
                    return Ok(bytes);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(url, attempt, max_attempts = self.max_attempts, error = %e, "Fetch attempt failed");
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

/// Fetcher that consults a `SampleCache` (keyed by URL) before the network
pub struct CachedFetcher<F> {
    inner: F,
    cache: Arc<SampleCache>,
}

impl<F: TrackFetcher> CachedFetcher<F> {
    pub fn new(inner: F, cache: Arc<SampleCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }
}

#[async_trait]
impl<F: TrackFetcher> TrackFetcher for CachedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        // The disk tier uses std::fs; keep it off the async workers
        let cache = Arc::clone(&self.cache);
        let key = url.to_string();
        match tokio::task::spawn_blocking(move || cache.get(&key)).await {
            Ok(Some(sample)) => return Ok(sample.as_ref().clone()),
            Ok(None) => {}
            Err(e) => warn!(url, error = %e, "Sample cache lookup task failed"),
        }

        let bytes = self.inner.fetch(url).await?;

        let cache = Arc::clone(&self.cache);
        let key = url.to_string();
        let sample = bytes.clone();
        match tokio::task::spawn_blocking(move || cache.put(&key, sample)).await {
            Ok(Ok(())) => {}
            // The fetched bytes are still good; only the disk tier failed
            Ok(Err(e)) => warn!(url, error = %e, "Failed to cache fetched track"),
            Err(e) => warn!(url, error = %e, "Sample cache store task failed"),
        }
        Ok(bytes)
    }
}
