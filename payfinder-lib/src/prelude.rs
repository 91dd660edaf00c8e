//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use payfinder_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Engine: `PaymentAppFinder`, `ResolutionRequest`, `ResolutionOutcome`
//! - Seams: `AppRegistry`, `ManifestFetcher`, `PaymentAppFinderDelegate`
//! - Identifiers: `MethodIdentifier`, `Origin`, `Fingerprint`
//! - Error types: `FinderError`, `FinderErrorCode`, `Result`

// Engine
pub use crate::finder::{
    FinderConfig, PaymentAppFinder, PaymentAppFinderDelegate, PaymentOptions, Provenance,
    ResolutionOutcome, ResolutionRequest, ResolutionStatus, ResolvedApp,
};

// Error handling
pub use crate::errors::{FetchError, FinderError, FinderErrorCode, ParseError};
pub use crate::Result;

// Apps
pub use crate::registry::{AppRegistry, CandidateApp, InMemoryAppRegistry};

// Manifests
pub use crate::fetcher::{FetcherConfig, ManifestFetcher};
pub use crate::manifest::{ManifestParser, PaymentMethodManifest, WebAppManifestSection};

// Identifiers
pub use crate::fingerprint::Fingerprint;
pub use crate::method::{KeywordAllowList, MethodIdentifier};
pub use crate::origin::{Origin, OriginSet, UrlPolicy};

// Store billing
pub use crate::billing::BillingConfig;

#[cfg(feature = "http-fetcher")]
pub use crate::fetcher::HttpManifestFetcher;
