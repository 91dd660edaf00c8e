//! Installed payment apps.
//!
//! Enumerating what is installed on a device is platform specific and lives
//! behind [`AppRegistry`]. The engine only sees immutable [`CandidateApp`]
//! snapshots taken once at the start of a resolution pass.

mod memory;

pub use memory::InMemoryAppRegistry;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fingerprint::{self, Fingerprint};
use crate::method::MethodIdentifier;

/// An installed app that may handle a payment method.
///
/// Method strings are copied verbatim from the app's own metadata and are
/// untrusted; they are validated when matched against a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateApp {
    /// Package identifier.
    pub package_name: String,

    /// Installed version code, compared against manifest `min_version`.
    #[serde(default)]
    pub version: i64,

    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Method the app declares as its default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_method: Option<String>,

    /// Additional methods the app declares.
    #[serde(default)]
    pub supported_methods: BTreeSet<String>,

    /// Fingerprints the app's metadata claims for its own signing key.
    #[serde(default)]
    pub declared_fingerprints: Vec<Fingerprint>,

    /// Fingerprints of the installed signing certificates, in order.
    #[serde(default)]
    pub signing_fingerprints: Vec<Fingerprint>,

    /// Whether the app exposes a ready-to-pay service.
    #[serde(default)]
    pub has_ready_to_pay_service: bool,

    /// Package that installed this app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_package: Option<String>,
}

impl CandidateApp {
    /// Create a candidate with no declared methods.
    pub fn new(package_name: impl Into<String>, version: i64) -> Self {
        Self {
            package_name: package_name.into(),
            version,
            label: None,
            default_method: None,
            supported_methods: BTreeSet::new(),
            declared_fingerprints: Vec::new(),
            signing_fingerprints: Vec::new(),
            has_ready_to_pay_service: false,
            installer_package: None,
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the default method.
    pub fn with_default_method(mut self, method: impl Into<String>) -> Self {
        self.default_method = Some(method.into());
        self
    }

    /// Add a supported method.
    pub fn with_supported_method(mut self, method: impl Into<String>) -> Self {
        self.supported_methods.insert(method.into());
        self
    }

    /// Add a fingerprint to the app's own declaration.
    pub fn with_declared_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.declared_fingerprints.push(fingerprint);
        self
    }

    /// Add an installed signing fingerprint.
    pub fn with_signing_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.signing_fingerprints.push(fingerprint);
        self
    }

    /// Mark the app as exposing a ready-to-pay service.
    pub fn with_ready_to_pay_service(mut self) -> Self {
        self.has_ready_to_pay_service = true;
        self
    }

    /// Set the installer package.
    pub fn with_installer(mut self, installer: impl Into<String>) -> Self {
        self.installer_package = Some(installer.into());
        self
    }

    /// Default method followed by supported methods, as declared.
    pub fn declared_method_names(&self) -> impl Iterator<Item = &str> {
        self.default_method
            .iter()
            .chain(self.supported_methods.iter())
            .map(String::as_str)
    }

    /// Whether the app declares `method`, comparing URLs in normalized form.
    pub fn declares(&self, method: &MethodIdentifier) -> bool {
        self.declared_method_names()
            .any(|declared| declared_matches(declared, method))
    }

    /// Whether the app declares `method` as its default.
    pub fn declares_default(&self, method: &MethodIdentifier) -> bool {
        self.default_method
            .as_deref()
            .is_some_and(|declared| declared_matches(declared, method))
    }

    /// Whether the app's declared fingerprints match its installed signature.
    ///
    /// An app that declares nothing is never self-verified.
    pub fn is_self_verified(&self) -> bool {
        fingerprint::matches(&self.signing_fingerprints, &self.declared_fingerprints)
    }
}

fn declared_matches(declared: &str, method: &MethodIdentifier) -> bool {
    let declared = declared.trim();
    match method {
        MethodIdentifier::Keyword(keyword) => declared == keyword,
        MethodIdentifier::Url(url) => Url::parse(declared).is_ok_and(|parsed| &parsed == url),
    }
}

/// Source of installed payment apps.
#[async_trait]
pub trait AppRegistry: Send + Sync {
    /// Snapshot the installed apps that declare any of `methods`.
    ///
    /// Returning extra apps is harmless; the engine filters again.
    async fn list_candidates(&self, methods: &[MethodIdentifier]) -> Vec<CandidateApp>;

    /// Whether `package_name` exposes a ready-to-pay service.
    async fn has_ready_to_pay_service(&self, _package_name: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::KeywordAllowList;
    use crate::origin::UrlPolicy;

    fn method(raw: &str) -> MethodIdentifier {
        MethodIdentifier::parse(raw, &KeywordAllowList::v1(), UrlPolicy::strict()).unwrap()
    }

    #[test]
    fn test_declares_normalizes_urls() {
        let app = CandidateApp::new("com.bobpay", 1)
            .with_default_method("https://bobpay.com")
            .with_supported_method("basic-card");

        assert!(app.declares(&method("https://bobpay.com/")));
        assert!(app.declares_default(&method("https://bobpay.com/")));
        assert!(app.declares(&method("basic-card")));
        assert!(!app.declares_default(&method("basic-card")));
        assert!(!app.declares(&method("https://bobpay.com/other")));
    }

    #[test]
    fn test_self_verification() {
        let key = Fingerprint::of_certificate(b"bobpay-cert");
        let other = Fingerprint::of_certificate(b"other-cert");

        let app = CandidateApp::new("com.bobpay", 1).with_signing_fingerprint(key);
        assert!(!app.is_self_verified());

        let app = app.with_declared_fingerprint(other);
        assert!(!app.is_self_verified());

        let app = app.with_declared_fingerprint(key);
        assert!(app.is_self_verified());
    }

    struct ListOnly(Vec<CandidateApp>);

    #[async_trait]
    impl AppRegistry for ListOnly {
        async fn list_candidates(&self, _methods: &[MethodIdentifier]) -> Vec<CandidateApp> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_default_ready_to_pay_is_false() {
        let app = CandidateApp::new("com.bobpay", 1).with_ready_to_pay_service();
        let registry = ListOnly(vec![app]);

        assert_eq!(registry.list_candidates(&[]).await.len(), 1);
        assert!(!registry.has_ready_to_pay_service("com.bobpay").await);
    }

    #[test]
    fn test_deserialize_minimal() {
        let app: CandidateApp =
            serde_json::from_str(r#"{"package_name": "com.bobpay", "default_method": "basic-card"}"#)
                .unwrap();
        assert_eq!(app.version, 0);
        assert_eq!(app.declared_method_names().collect::<Vec<_>>(), vec!["basic-card"]);
        assert!(app.signing_fingerprints.is_empty());
    }
}
