//! App-store billing methods.
//!
//! Store billing identifiers look like URL methods but are never fetched.
//! An app may claim one only inside a trusted context, when the merchant
//! asked for no shipping or contact delegation, and (by default) only if the
//! app was installed by the store itself.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::method::MethodIdentifier;
use crate::registry::CandidateApp;

/// Default store billing method.
pub const DEFAULT_BILLING_METHOD: &str = "https://play.google.com/billing";

/// Default store installer package.
pub const DEFAULT_STORE_INSTALLER: &str = "com.android.vending";

/// Store billing settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Method URLs treated as store billing.
    #[serde(default = "default_billing_methods")]
    pub billing_methods: BTreeSet<Url>,

    /// Installers whose apps may claim store billing.
    #[serde(default = "default_installer_packages")]
    pub installer_packages: BTreeSet<String>,

    /// Whether the installer check applies.
    #[serde(default = "default_require_store_installer")]
    pub require_store_installer: bool,
}

fn default_billing_methods() -> BTreeSet<Url> {
    Url::parse(DEFAULT_BILLING_METHOD).into_iter().collect()
}

fn default_installer_packages() -> BTreeSet<String> {
    [DEFAULT_STORE_INSTALLER.to_string()].into_iter().collect()
}

fn default_require_store_installer() -> bool {
    true
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            billing_methods: default_billing_methods(),
            installer_packages: default_installer_packages(),
            require_store_installer: default_require_store_installer(),
        }
    }
}

impl BillingConfig {
    /// Add a store billing method.
    pub fn with_billing_method(mut self, method: Url) -> Self {
        self.billing_methods.insert(method);
        self
    }

    /// Add an accepted installer.
    pub fn with_installer_package(mut self, installer: impl Into<String>) -> Self {
        self.installer_packages.insert(installer.into());
        self
    }

    /// Enable or disable the installer check.
    pub fn with_require_store_installer(mut self, required: bool) -> Self {
        self.require_store_installer = required;
        self
    }

    /// Whether `method` is a store billing method.
    pub fn is_billing_method(&self, method: &MethodIdentifier) -> bool {
        method
            .as_url()
            .is_some_and(|url| self.billing_methods.contains(url))
    }

    fn installer_allowed(&self, app: &CandidateApp) -> bool {
        !self.require_store_installer
            || app
                .installer_package
                .as_ref()
                .is_some_and(|installer| self.installer_packages.contains(installer))
    }
}

/// Store billing methods from `requested_billing` that `app` may claim.
pub fn allowed_billing_methods(
    app: &CandidateApp,
    requested_billing: &[MethodIdentifier],
    trusted_context: bool,
    requests_delegation: bool,
    config: &BillingConfig,
) -> Vec<MethodIdentifier> {
    if !trusted_context || requests_delegation || !config.installer_allowed(app) {
        return Vec::new();
    }

    requested_billing
        .iter()
        .filter(|method| config.is_billing_method(method) && app.declares(method))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::KeywordAllowList;
    use crate::origin::UrlPolicy;

    fn billing() -> MethodIdentifier {
        MethodIdentifier::parse(DEFAULT_BILLING_METHOD, &KeywordAllowList::v1(), UrlPolicy::strict())
            .unwrap()
    }

    fn store_app() -> CandidateApp {
        CandidateApp::new("com.game", 1)
            .with_default_method(DEFAULT_BILLING_METHOD)
            .with_installer(DEFAULT_STORE_INSTALLER)
    }

    #[test]
    fn test_allowed_in_trusted_context() {
        let allowed = allowed_billing_methods(&store_app(), &[billing()], true, false, &BillingConfig::default());
        assert_eq!(allowed, vec![billing()]);
    }

    #[test]
    fn test_each_condition_is_required() {
        let config = BillingConfig::default();
        let requested = [billing()];

        assert!(allowed_billing_methods(&store_app(), &requested, false, false, &config).is_empty());
        assert!(allowed_billing_methods(&store_app(), &requested, true, true, &config).is_empty());

        let sideloaded = CandidateApp::new("com.game", 1).with_default_method(DEFAULT_BILLING_METHOD);
        assert!(allowed_billing_methods(&sideloaded, &requested, true, false, &config).is_empty());

        let undeclared = CandidateApp::new("com.game", 1).with_installer(DEFAULT_STORE_INSTALLER);
        assert!(allowed_billing_methods(&undeclared, &requested, true, false, &config).is_empty());
    }

    #[test]
    fn test_installer_check_can_be_disabled() {
        let config = BillingConfig::default().with_require_store_installer(false);
        let sideloaded = CandidateApp::new("com.game", 1).with_default_method(DEFAULT_BILLING_METHOD);
        assert_eq!(
            allowed_billing_methods(&sideloaded, &[billing()], true, false, &config).len(),
            1
        );
    }

    #[test]
    fn test_non_billing_urls_are_ignored() {
        let other =
            MethodIdentifier::parse("https://bobpay.com/webpay", &KeywordAllowList::v1(), UrlPolicy::strict())
                .unwrap();
        let app = store_app().with_supported_method("https://bobpay.com/webpay");
        let config = BillingConfig::default();
        assert!(!config.is_billing_method(&other));
        assert!(allowed_billing_methods(&app, &[other], true, false, &config).is_empty());
    }
}
