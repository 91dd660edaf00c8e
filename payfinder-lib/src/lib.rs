//! Payfinder library.
//!
//! Decides which installed payment apps are authorized to handle the payment
//! methods a merchant requests. Authorization is established from the app's
//! own signed declaration, from the method owner's Payment Method Manifest
//! (`default_applications` and `supported_origins`), or from store billing
//! rules. Everything fails closed: a download or parse failure removes a path
//! to authorization and never adds one.
//!
//! Installed-app enumeration is platform specific and injected through the
//! [`AppRegistry`] trait; manifest downloads go through [`ManifestFetcher`].
//!
//! # Features
//!
//! - **Manifest parsing**: strict, bounded parsers for both manifest formats
//! - **HTTPS fetching** (`http-fetcher`, default): reqwest-based downloads
//!   with redirect, size and timeout limits
//! - **Test utilities** (`test-utils`): scripted fetcher, recording delegate
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use payfinder_lib::prelude::*;
//!
//! let registry = Arc::new(InMemoryAppRegistry::from_json(&std::fs::read_to_string("apps.json")?)?);
//! let finder = PaymentAppFinder::with_http_fetcher(registry, FinderConfig::from_env(), FetcherConfig::from_env())?;
//!
//! let merchant = Origin::parse("https://shop.example", UrlPolicy::strict())?;
//! let outcome = finder
//!     .resolve(ResolutionRequest::new(merchant, ["https://bobpay.com/webpay"]))
//!     .await;
//! ```

pub mod billing;
pub mod errors;
pub mod fetcher;
pub mod finder;
pub mod fingerprint;
pub mod manifest;
pub mod method;
pub mod origin;
pub mod prelude;
pub mod registry;

/// Test utilities for resolution testing.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use billing::{allowed_billing_methods, BillingConfig};
pub use errors::{FetchError, FinderError, FinderErrorCode, ParseError};
pub use fetcher::{FetcherConfig, ManifestFetcher};
pub use finder::{
    FinderConfig, PaymentAppFinder, PaymentAppFinderDelegate, PaymentOptions, Provenance,
    ResolutionOutcome, ResolutionRequest, ResolutionStatus, ResolvedApp,
};
pub use fingerprint::Fingerprint;
pub use manifest::{
    parse_payment_method_manifest, parse_web_app_manifest, ManifestParser, PaymentMethodManifest,
    WebAppManifestSection,
};
pub use method::{KeywordAllowList, MethodIdentifier};
pub use origin::{Origin, OriginSet, UrlPolicy};
pub use registry::{AppRegistry, CandidateApp, InMemoryAppRegistry};

#[cfg(feature = "http-fetcher")]
pub use fetcher::HttpManifestFetcher;

/// Common result alias for payfinder operations.
pub type Result<T> = std::result::Result<T, FinderError>;
