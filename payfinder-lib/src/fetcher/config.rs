//! Fetcher configuration.
//!
//! Every field can be overridden from the environment:
//!
//! - `PAYFINDER_TIMEOUT_SECS` - per-request timeout
//! - `PAYFINDER_MAX_MANIFEST_BYTES` - body size limit
//! - `PAYFINDER_ALLOW_HTTP_LOOPBACK` - accept `http://localhost` (`1`/`true`)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::origin::UrlPolicy;

/// Environment variable for the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "PAYFINDER_TIMEOUT_SECS";

/// Environment variable for the manifest size limit in bytes.
pub const ENV_MAX_MANIFEST_BYTES: &str = "PAYFINDER_MAX_MANIFEST_BYTES";

/// Environment variable enabling plain HTTP on loopback hosts.
pub const ENV_ALLOW_HTTP_LOOPBACK: &str = "PAYFINDER_ALLOW_HTTP_LOOPBACK";

/// Configuration for manifest downloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Request timeout in seconds, covering connect, redirects and body.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Largest accepted manifest body.
    #[serde(default = "default_max_manifest_bytes")]
    pub max_manifest_bytes: u64,

    /// Redirect hops followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Which URLs may be requested, including redirect targets.
    #[serde(default)]
    pub url_policy: UrlPolicy,
}

fn default_timeout() -> u64 {
    10
}

fn default_max_manifest_bytes() -> u64 {
    2 * 1024 * 1024
}

fn default_max_redirects() -> usize {
    3
}

fn default_user_agent() -> String {
    concat!("payfinder/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_manifest_bytes: default_max_manifest_bytes(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            url_policy: UrlPolicy::strict(),
        }
    }
}

impl FetcherConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secs) = parse_var(&lookup, ENV_TIMEOUT_SECS) {
            self.timeout_secs = secs;
        }
        if let Some(bytes) = parse_var(&lookup, ENV_MAX_MANIFEST_BYTES) {
            self.max_manifest_bytes = bytes;
        }
        if let Some(allow) = lookup(ENV_ALLOW_HTTP_LOOPBACK) {
            self.url_policy.allow_http_loopback = parse_flag(&allow);
        }
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the body size limit.
    pub fn with_max_manifest_bytes(mut self, bytes: u64) -> Self {
        self.max_manifest_bytes = bytes;
        self
    }

    /// Set the redirect limit.
    pub fn with_max_redirects(mut self, hops: usize) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the URL policy.
    pub fn with_url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }

    /// Timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout in milliseconds, saturating for absurdly large settings.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_secs.saturating_mul(1000)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

pub(crate) fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_redirects, 3);
        assert!(!config.url_policy.allow_http_loopback);
        assert!(config.user_agent.starts_with("payfinder/"));
    }

    #[test]
    fn test_overrides() {
        let config = FetcherConfig::default().with_overrides(lookup(&[
            (ENV_TIMEOUT_SECS, "3"),
            (ENV_MAX_MANIFEST_BYTES, "4096"),
            (ENV_ALLOW_HTTP_LOOPBACK, "true"),
        ]));
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.max_manifest_bytes, 4096);
        assert!(config.url_policy.allow_http_loopback);
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let config = FetcherConfig::default().with_overrides(lookup(&[(
            ENV_TIMEOUT_SECS,
            "18446744073709551615",
        )]));
        assert_eq!(config.timeout_secs, u64::MAX);
        assert_eq!(config.timeout_ms(), u64::MAX);
        assert_eq!(FetcherConfig::default().with_timeout(3).timeout_ms(), 3000);
    }

    #[test]
    fn test_bad_override_is_ignored() {
        let config = FetcherConfig::default().with_overrides(lookup(&[(ENV_TIMEOUT_SECS, "soon")]));
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: FetcherConfig = serde_json::from_str(r#"{"timeout_secs": 1}"#).unwrap();
        assert_eq!(config.timeout_secs, 1);
        assert_eq!(config.max_manifest_bytes, default_max_manifest_bytes());
    }

    #[test]
    fn test_builders() {
        let config = FetcherConfig::default()
            .with_timeout(5)
            .with_max_redirects(0)
            .with_user_agent("test-agent")
            .with_url_policy(UrlPolicy::with_http_loopback());
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_redirects, 0);
        assert_eq!(config.user_agent, "test-agent");
        assert!(config.url_policy.allow_http_loopback);
    }
}
