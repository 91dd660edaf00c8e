//! Scriptable manifest fetcher.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::errors::FetchError;
use crate::fetcher::ManifestFetcher;
use crate::origin::Origin;

/// Scripted reply for one URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockResponse {
    /// 200 with this body.
    Body(Vec<u8>),
    /// Non-2xx status.
    Status(u16),
    /// Timeout error.
    Timeout,
    /// Never completes.
    Pending,
}

/// In-memory [`ManifestFetcher`] that records every request.
///
/// Unscripted URLs answer 404.
#[derive(Debug, Default)]
pub struct MockManifestFetcher {
    responses: RwLock<HashMap<Url, MockResponse>>,
    requests: Mutex<Vec<Url>>,
    delay: Option<Duration>,
}

impl MockManifestFetcher {
    /// Create a fetcher with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every completed response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `url` with `body`.
    pub fn with_body(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.set_response(url, MockResponse::Body(body.into()));
        self
    }

    /// Answer `url` with an HTTP error status.
    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set_response(url, MockResponse::Status(status));
        self
    }

    /// Never answer `url`.
    pub fn with_pending(self, url: &str) -> Self {
        self.set_response(url, MockResponse::Pending);
        self
    }

    /// Script the reply for `url`, replacing any previous one.
    ///
    /// # Panics
    ///
    /// Panics if `url` is not absolute.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let url = Url::parse(url).expect("mock URL must be absolute");
        let mut responses = self.responses.write().unwrap_or_else(|e| e.into_inner());
        responses.insert(url, response);
    }

    /// Every requested URL, in request order.
    pub fn requests(&self) -> Vec<Url> {
        let requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.clone()
    }

    /// How often `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        let requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.iter().filter(|requested| requested.as_str() == url).count()
    }
}

#[async_trait]
impl ManifestFetcher for MockManifestFetcher {
    async fn fetch(&self, _merchant: &Origin, url: &Url) -> Result<Vec<u8>, FetchError> {
        {
            let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
            requests.push(url.clone());
        }
        let response = {
            let responses = self.responses.read().unwrap_or_else(|e| e.into_inner());
            responses.get(url).cloned()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match response {
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status,
            }),
            Some(MockResponse::Timeout) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: self.delay.map_or(0, |d| d.as_millis() as u64),
            }),
            Some(MockResponse::Pending) => std::future::pending().await,
            None => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::merchant;

    #[tokio::test]
    async fn test_scripted_responses() {
        let fetcher = MockManifestFetcher::new()
            .with_body("https://bobpay.com/webpay", "{}")
            .with_status("https://bobpay.com/gone", 410);

        let ok = Url::parse("https://bobpay.com/webpay").unwrap();
        assert_eq!(fetcher.fetch(&merchant(), &ok).await.unwrap(), b"{}");

        let gone = Url::parse("https://bobpay.com/gone").unwrap();
        assert!(matches!(
            fetcher.fetch(&merchant(), &gone).await,
            Err(FetchError::HttpStatus { status: 410, .. })
        ));

        let missing = Url::parse("https://bobpay.com/missing").unwrap();
        assert!(matches!(
            fetcher.fetch(&merchant(), &missing).await,
            Err(FetchError::HttpStatus { status: 404, .. })
        ));

        assert_eq!(fetcher.requests().len(), 3);
        assert_eq!(fetcher.request_count("https://bobpay.com/webpay"), 1);
    }
}
