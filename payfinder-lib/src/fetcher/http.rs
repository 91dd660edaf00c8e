//! reqwest-backed manifest fetcher.

use std::error::Error as _;

use async_trait::async_trait;
use reqwest::header::{LINK, REFERER};
use reqwest::redirect;
use tracing::{debug, warn};
use url::Url;

use super::{FetcherConfig, ManifestFetcher};
use crate::errors::{FetchError, FinderError};
use crate::origin::{Origin, UrlPolicy};

/// `rel` value announcing a Payment Method Manifest.
const MANIFEST_LINK_REL: &str = "payment-method-manifest";

/// Downloads manifests over HTTPS.
///
/// Redirects are followed up to [`FetcherConfig::max_redirects`] hops and
/// every hop is checked against the URL policy. Bodies are streamed and
/// abandoned as soon as they exceed [`FetcherConfig::max_manifest_bytes`].
pub struct HttpManifestFetcher {
    config: FetcherConfig,
    client: reqwest::Client,
}

impl HttpManifestFetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .redirect(redirect_policy(config.url_policy, config.max_redirects))
            .build()
            .map_err(|e| FinderError::Client(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a fetcher from environment-derived configuration.
    pub fn from_env() -> crate::Result<Self> {
        Self::new(FetcherConfig::from_env())
    }

    /// Get the configuration.
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    async fn get(&self, merchant: &Origin, url: &Url) -> Result<reqwest::Response, FetchError> {
        self.config
            .url_policy
            .check(url)
            .map_err(|reason| FetchError::Insecure {
                url: url.to_string(),
                reason,
            })?;

        let response = self
            .client
            .get(url.clone())
            .header(REFERER, merchant.as_str())
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(url = %url, final_url = %response.url(), status = status.as_u16(), "manifest response");
        Ok(response)
    }

    async fn read_body(&self, url: &Url, mut response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let limit = self.config.max_manifest_bytes;
        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit,
        };

        if response.content_length().is_some_and(|len| len > limit) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.map_reqwest_error(url, e))?
        {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    /// Map reqwest errors to FetchError.
    fn map_reqwest_error(&self, url: &Url, e: reqwest::Error) -> FetchError {
        let url = url.to_string();
        if e.is_timeout() {
            FetchError::Timeout {
                url,
                timeout_ms: self.config.timeout_ms(),
            }
        } else if e.is_redirect() {
            let reason = e
                .source()
                .map(ToString::to_string)
                .unwrap_or_else(|| e.to_string());
            FetchError::Insecure { url, reason }
        } else {
            FetchError::Network {
                url,
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    #[tracing::instrument(skip(self), fields(merchant = %merchant, url = %url))]
    async fn fetch(&self, merchant: &Origin, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.get(merchant, url).await?;
        self.read_body(url, response).await
    }

    #[tracing::instrument(skip(self), fields(merchant = %merchant, url = %url))]
    async fn fetch_payment_method_manifest(
        &self,
        merchant: &Origin,
        url: &Url,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self.get(merchant, url).await?;

        let link = response
            .headers()
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(find_manifest_link)
            .map(str::to_string);

        let Some(link) = link else {
            return self.read_body(url, response).await;
        };

        let target = response.url().join(&link).map_err(|e| FetchError::Insecure {
            url: url.to_string(),
            reason: format!("bad manifest link \"{link}\": {e}"),
        })?;
        debug!(url = %url, manifest = %target, "following manifest link");
        self.fetch(merchant, &target).await
    }
}

fn redirect_policy(policy: UrlPolicy, max_redirects: usize) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error(format!("more than {max_redirects} redirects"));
        }
        match policy.check(attempt.url()) {
            Ok(()) => attempt.follow(),
            Err(reason) => {
                let target = attempt.url().to_string();
                warn!(target_url = %target, %reason, "refusing redirect");
                attempt.error(format!("redirect to {target} refused: {reason}"))
            }
        }
    })
}

/// Finds the first `Link` target whose `rel` includes `payment-method-manifest`.
///
/// Handles `<url>; rel="a b"` entries separated by commas.
fn find_manifest_link(header: &str) -> Option<&str> {
    let mut rest = header;
    loop {
        let start = rest.find('<')?;
        let end = start + rest[start..].find('>')?;
        let target = rest[start + 1..end].trim();

        let params_end = rest[end..].find(",").map_or(rest.len(), |i| end + i);
        let params = &rest[end + 1..params_end];

        let is_manifest = params.split(';').any(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_ascii_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case(MANIFEST_LINK_REL))
        });
        if is_manifest {
            return Some(target);
        }
        rest = &rest[params_end..];
    }
}
