//! Manifest parsing.
//!
//! Two document kinds are understood:
//!
//! - **Payment Method Manifest**, served at (or linked from) a method URL:
//!
//!   ```json
//!   { "default_applications": ["https://bobpay.com/app.json"],
//!     "supported_origins": ["https://alicepay.com"] }
//!   ```
//!
//! - **Web App Manifest**, referenced from `default_applications`:
//!
//!   ```json
//!   { "related_applications": [
//!       { "platform": "play", "id": "com.bobpay", "min_version": "1",
//!         "fingerprints": [{ "type": "sha256_cert", "value": "AA:BB:..." }] } ] }
//!   ```
//!
//! Both parsers are pure functions of their input. A malformed entry rejects
//! the whole document; there is no element skipping.

mod payment_method;
mod web_app;

pub use payment_method::PaymentMethodManifest;
pub use web_app::WebAppManifestSection;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::errors::ParseError;
use crate::origin::UrlPolicy;

/// Platform tag used by the default app store in `related_applications`.
pub const DEFAULT_STORE_PLATFORM: &str = "play";

/// Maximum number of `default_applications` entries.
pub const MAX_DEFAULT_APPLICATIONS: usize = 100;

/// Maximum number of `supported_origins` entries.
pub const MAX_SUPPORTED_ORIGINS: usize = 100_000;

/// Maximum number of `related_applications` entries.
pub const MAX_RELATED_APPLICATIONS: usize = 100;

/// Maximum number of fingerprints per related application.
pub const MAX_FINGERPRINTS: usize = 100;

/// Parser settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestParser {
    /// Which URLs may appear in `default_applications` and `supported_origins`.
    #[serde(default)]
    pub url_policy: UrlPolicy,

    /// `platform` value of related applications to extract.
    #[serde(default = "default_store_platform")]
    pub store_platform: String,
}

fn default_store_platform() -> String {
    DEFAULT_STORE_PLATFORM.to_string()
}

impl Default for ManifestParser {
    fn default() -> Self {
        Self {
            url_policy: UrlPolicy::strict(),
            store_platform: default_store_platform(),
        }
    }
}

impl ManifestParser {
    /// Create a parser with the given URL policy and the default store platform.
    pub fn new(url_policy: UrlPolicy) -> Self {
        Self {
            url_policy,
            ..Self::default()
        }
    }

    /// Set the store platform tag.
    pub fn with_store_platform(mut self, platform: impl Into<String>) -> Self {
        self.store_platform = platform.into();
        self
    }

    /// Parse a Payment Method Manifest downloaded for `url`.
    pub fn parse_payment_method_manifest(
        &self,
        url: &Url,
        bytes: &[u8],
    ) -> Result<PaymentMethodManifest, ParseError> {
        payment_method::parse(url, bytes, self.url_policy)
    }

    /// Parse a Web App Manifest into its store sections.
    pub fn parse_web_app_manifest(
        &self,
        bytes: &[u8],
    ) -> Result<Vec<WebAppManifestSection>, ParseError> {
        web_app::parse(bytes, &self.store_platform)
    }
}

/// Parse a Payment Method Manifest with the default (HTTPS only) parser.
pub fn parse_payment_method_manifest(
    url: &Url,
    bytes: &[u8],
) -> Result<PaymentMethodManifest, ParseError> {
    ManifestParser::default().parse_payment_method_manifest(url, bytes)
}

/// Parse a Web App Manifest with the default parser.
pub fn parse_web_app_manifest(bytes: &[u8]) -> Result<Vec<WebAppManifestSection>, ParseError> {
    ManifestParser::default().parse_web_app_manifest(bytes)
}

fn parse_root(bytes: &[u8]) -> Result<Map<String, Value>, ParseError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(root)) => Ok(root),
        Ok(_) => Err(ParseError::NotAnObject),
        Err(e) => Err(ParseError::InvalidJson(e.to_string())),
    }
}

fn bounded_array<'a>(
    value: &'a Value,
    field: &str,
    limit: usize,
) -> Result<&'a Vec<Value>, ParseError> {
    let items = value
        .as_array()
        .ok_or_else(|| ParseError::invalid(field, "expected an array"))?;
    if items.len() > limit {
        return Err(ParseError::TooManyEntries {
            field: field.to_string(),
            limit,
        });
    }
    Ok(items)
}
