//! Feed transport.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};

/// Trait for anything that can hand back the raw bytes of a rate feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch the current payload.
    async fn fetch(&self) -> FxResult<Vec<u8>>;
}

/// Fetches the feed over HTTP with a bounded timeout.
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFeedSource {
    /// Create a source for `url`; every request is bounded by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> FxResult<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FxError::FeedUnavailable {
                provider: url.clone(),
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self { client, url })
    }

    /// Create a source that shares an existing client.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    fn unavailable(&self, reason: impl Into<String>) -> FxError {
        FxError::FeedUnavailable {
            provider: self.url.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> FxResult<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = %status, "Rate feed returned non-success status");
            return Err(self.unavailable(format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.unavailable(format!("reading body: {e}")))?;

        debug!(url = %self.url, bytes = body.len(), "Fetched rate feed");
        Ok(body.to_vec())
    }
}

/// In-memory feed source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct StaticFeedSource {
    name: String,
    payload: parking_lot::Mutex<Result<Vec<u8>, String>>,
    fetches: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl StaticFeedSource {
    /// Create a source that serves `payload`.
    pub fn new(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            payload: parking_lot::Mutex::new(Ok(payload.into())),
            fetches: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Replace the served payload.
    pub fn set_payload(&self, payload: impl Into<Vec<u8>>) {
        *self.payload.lock() = Ok(payload.into());
    }

    /// Make every subsequent fetch fail.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.payload.lock() = Err(reason.into());
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl FeedSource for StaticFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> FxResult<Vec<u8>> {
        self.fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.payload
            .lock()
            .clone()
            .map_err(|reason| FxError::FeedUnavailable {
                provider: self.name.clone(),
                reason,
            })
    }
}
