//! Resolution engine configuration.

use serde::{Deserialize, Serialize};

use crate::billing::BillingConfig;
use crate::fetcher::config::{parse_flag, ENV_ALLOW_HTTP_LOOPBACK};
use crate::manifest::{ManifestParser, DEFAULT_STORE_PLATFORM};
use crate::method::KeywordAllowList;
use crate::origin::UrlPolicy;

/// Environment variable that skips the ready-to-pay service lookup.
pub const ENV_BYPASS_READY_TO_PAY: &str = "PAYFINDER_BYPASS_READY_TO_PAY";

/// Configuration for [`PaymentAppFinder`](super::PaymentAppFinder).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Which URLs are accepted as method identifiers and manifest entries.
    #[serde(default)]
    pub url_policy: UrlPolicy,

    /// Keyword methods that may be requested.
    #[serde(default)]
    pub keywords: KeywordAllowList,

    /// Store billing rules.
    #[serde(default)]
    pub billing: BillingConfig,

    /// `platform` tag of store entries in Web App Manifests.
    #[serde(default = "default_store_platform")]
    pub store_platform: String,

    /// Skip asking the registry for ready-to-pay services.
    #[serde(default)]
    pub bypass_ready_to_pay_check: bool,
}

fn default_store_platform() -> String {
    DEFAULT_STORE_PLATFORM.to_string()
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            url_policy: UrlPolicy::strict(),
            keywords: KeywordAllowList::v1(),
            billing: BillingConfig::default(),
            store_platform: default_store_platform(),
            bypass_ready_to_pay_check: false,
        }
    }
}

impl FinderConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(allow) = lookup(ENV_ALLOW_HTTP_LOOPBACK) {
            self.url_policy.allow_http_loopback = parse_flag(&allow);
        }
        if let Some(bypass) = lookup(ENV_BYPASS_READY_TO_PAY) {
            self.bypass_ready_to_pay_check = parse_flag(&bypass);
        }
        self
    }

    /// Set the URL policy.
    pub fn with_url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }

    /// Set the keyword allow-list.
    pub fn with_keywords(mut self, keywords: KeywordAllowList) -> Self {
        self.keywords = keywords;
        self
    }

    /// Set the store billing rules.
    pub fn with_billing(mut self, billing: BillingConfig) -> Self {
        self.billing = billing;
        self
    }

    /// Set the store platform tag.
    pub fn with_store_platform(mut self, platform: impl Into<String>) -> Self {
        self.store_platform = platform.into();
        self
    }

    /// Skip the ready-to-pay service lookup.
    pub fn with_bypass_ready_to_pay_check(mut self, bypass: bool) -> Self {
        self.bypass_ready_to_pay_check = bypass;
        self
    }

    /// Manifest parser matching this configuration.
    pub fn parser(&self) -> ManifestParser {
        ManifestParser::new(self.url_policy).with_store_platform(self.store_platform.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let config = FinderConfig::default().with_overrides(|key| match key {
            ENV_BYPASS_READY_TO_PAY => Some("1".to_string()),
            ENV_ALLOW_HTTP_LOOPBACK => Some("false".to_string()),
            _ => None,
        });
        assert!(config.bypass_ready_to_pay_check);
        assert!(!config.url_policy.allow_http_loopback);
    }

    #[test]
    fn test_deserialize_empty_object() {
        let config: FinderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FinderConfig::default());
    }

    #[test]
    fn test_parser_follows_config() {
        let parser = FinderConfig::default()
            .with_url_policy(UrlPolicy::with_http_loopback())
            .with_store_platform("appgallery")
            .parser();
        assert!(parser.url_policy.allow_http_loopback);
        assert_eq!(parser.store_platform, "appgallery");
    }
}
