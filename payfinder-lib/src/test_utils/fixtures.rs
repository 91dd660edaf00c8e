//! Test fixtures and data generators.

use serde_json::json;
use url::Url;

use crate::fingerprint::Fingerprint;
use crate::method::{KeywordAllowList, MethodIdentifier};
use crate::origin::{Origin, UrlPolicy};
use crate::registry::CandidateApp;

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Merchant page origin.
    pub const MERCHANT: &'static str = "https://shop.example";

    /// BobPay's URL payment method.
    pub const BOBPAY_METHOD: &'static str = "https://bobpay.com/webpay";

    /// BobPay's Web App Manifest.
    pub const BOBPAY_APP_MANIFEST: &'static str = "https://bobpay.com/app.json";

    /// BobPay's package.
    pub const BOBPAY_PACKAGE: &'static str = "com.bobpay";

    /// BobPay's signing certificate seed.
    pub const BOBPAY_CERT: &'static str = "bobpay-release-cert";

    /// AlicePay's URL payment method.
    pub const ALICEPAY_METHOD: &'static str = "https://alicepay.com/webpay";

    /// AlicePay's Web App Manifest.
    pub const ALICEPAY_APP_MANIFEST: &'static str = "https://alicepay.com/app.json";

    /// AlicePay's origin.
    pub const ALICEPAY_ORIGIN: &'static str = "https://alicepay.com";

    /// AlicePay's package.
    pub const ALICEPAY_PACKAGE: &'static str = "com.alicepay";

    /// AlicePay's signing certificate seed.
    pub const ALICEPAY_CERT: &'static str = "alicepay-release-cert";
}

/// The fixture merchant origin.
pub fn merchant() -> Origin {
    Origin::parse(TestFixtures::MERCHANT, UrlPolicy::strict()).expect("fixture origin")
}

/// Parse a fixture URL.
pub fn test_url(raw: &str) -> Url {
    Url::parse(raw).expect("fixture URL")
}

/// Parse a method identifier with the default allow-list and strict policy.
pub fn method(raw: &str) -> MethodIdentifier {
    MethodIdentifier::parse(raw, &KeywordAllowList::v1(), UrlPolicy::strict())
        .expect("fixture method")
}

/// Deterministic fingerprint of a fake certificate named `seed`.
pub fn test_fingerprint(seed: &str) -> Fingerprint {
    Fingerprint::of_certificate(seed.as_bytes())
}

/// BobPay as installed from the store: default method `BOBPAY_METHOD`,
/// signed with `BOBPAY_CERT`, declaring no fingerprints of its own.
pub fn bobpay_app(version: i64) -> CandidateApp {
    CandidateApp::new(TestFixtures::BOBPAY_PACKAGE, version)
        .with_label("BobPay")
        .with_default_method(TestFixtures::BOBPAY_METHOD)
        .with_signing_fingerprint(test_fingerprint(TestFixtures::BOBPAY_CERT))
}

/// A Payment Method Manifest document.
///
/// A single `"*"` entry in `supported_origins` produces the wildcard form.
pub fn method_manifest_json(default_applications: &[&str], supported_origins: &[&str]) -> String {
    let supported_origins = if supported_origins == ["*"] {
        json!("*")
    } else {
        json!(supported_origins)
    };
    json!({
        "default_applications": default_applications,
        "supported_origins": supported_origins,
    })
    .to_string()
}

/// A Web App Manifest with one store section per `(package, min_version, fingerprints)`.
pub fn web_app_manifest_json(sections: &[(&str, i64, &[Fingerprint])]) -> String {
    let related: Vec<_> = sections
        .iter()
        .map(|(package, min_version, fingerprints)| {
            let fingerprints: Vec<_> = fingerprints
                .iter()
                .map(|fingerprint| json!({ "type": "sha256_cert", "value": fingerprint.to_string() }))
                .collect();
            json!({
                "platform": "play",
                "id": package,
                "min_version": min_version.to_string(),
                "fingerprints": fingerprints,
            })
        })
        .collect();
    json!({ "name": "Test Pay", "related_applications": related }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{parse_payment_method_manifest, parse_web_app_manifest};
    use crate::origin::OriginSet;

    #[test]
    fn test_fixture_documents_parse() {
        let url = test_url(TestFixtures::BOBPAY_METHOD);
        let manifest = parse_payment_method_manifest(
            &url,
            method_manifest_json(&[TestFixtures::BOBPAY_APP_MANIFEST], &[TestFixtures::ALICEPAY_ORIGIN])
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(manifest.default_applications.len(), 1);
        assert_eq!(manifest.supported_origins.len(), 1);

        let wildcard = parse_payment_method_manifest(&url, method_manifest_json(&[], &["*"]).as_bytes()).unwrap();
        assert_eq!(wildcard.supported_origins, OriginSet::None);
        assert!(wildcard.wildcard_origins);

        let key = test_fingerprint(TestFixtures::BOBPAY_CERT);
        let sections =
            parse_web_app_manifest(web_app_manifest_json(&[(TestFixtures::BOBPAY_PACKAGE, 2, &[key])]).as_bytes())
                .unwrap();
        assert_eq!(sections[0].min_version, 2);
        assert_eq!(sections[0].fingerprints, vec![key]);
    }
}
