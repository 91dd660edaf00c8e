//! Test utilities for payment app resolution.
//!
//! This module provides testing infrastructure including:
//! - A scriptable in-memory [`ManifestFetcher`](crate::fetcher::ManifestFetcher)
//! - A delegate that records every callback
//! - Fixtures for manifests, fingerprints and apps
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use payfinder_lib::test_utils::{method_manifest_json, MockManifestFetcher, TestFixtures};
//!
//! let fetcher = Arc::new(
//!     MockManifestFetcher::new()
//!         .with_body(TestFixtures::BOBPAY_METHOD, method_manifest_json(&[TestFixtures::BOBPAY_APP_MANIFEST], &[])),
//! );
//! ```

mod delegate;
mod fixtures;
mod mock_fetcher;

pub use delegate::{DelegateEvent, RecordingDelegate};
pub use fixtures::{
    bobpay_app, merchant, method, method_manifest_json, test_fingerprint, test_url,
    web_app_manifest_json, TestFixtures,
};
pub use mock_fetcher::{MockManifestFetcher, MockResponse};
