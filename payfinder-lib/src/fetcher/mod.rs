//! Manifest download.
//!
//! The resolution engine only ever talks to [`ManifestFetcher`]. The
//! production implementation is [`HttpManifestFetcher`] (feature
//! `http-fetcher`); tests substitute an in-memory mock.
//!
//! Fetchers perform exactly one logical download per call. De-duplication
//! across a resolution pass is the coordinator's job, and nothing retries.

pub mod config;
#[cfg(feature = "http-fetcher")]
mod http;

pub use config::FetcherConfig;
#[cfg(feature = "http-fetcher")]
pub use http::HttpManifestFetcher;

use async_trait::async_trait;
use url::Url;

use crate::errors::FetchError;
use crate::origin::Origin;

/// Downloads manifest documents.
///
/// `merchant` is the origin of the page that requested payment. It is
/// request context only and never influences authorization.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Download the document at `url`.
    ///
    /// Implementations must refuse non-HTTPS URLs (including redirect
    /// hops) and must not return a partial body on failure.
    async fn fetch(&self, merchant: &Origin, url: &Url) -> Result<Vec<u8>, FetchError>;

    /// Download the Payment Method Manifest for the method URL `url`.
    ///
    /// HTTP implementations may resolve a `Link: rel="payment-method-manifest"`
    /// indirection here. The default treats the method URL as the manifest.
    async fn fetch_payment_method_manifest(
        &self,
        merchant: &Origin,
        url: &Url,
    ) -> Result<Vec<u8>, FetchError> {
        self.fetch(merchant, url).await
    }
}
