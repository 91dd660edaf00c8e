//! Web origins and `supported_origins` matching.
//!
//! An [`Origin`] is the scheme + host + port serialization of a URL
//! (`https://alicepay.com`, `https://shop.example:8443`). Matching is exact
//! string equality: no subdomain, path or wildcard matching.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

/// Which URLs the engine is willing to treat as trustworthy.
///
/// Only HTTPS is accepted by default. `allow_http_loopback` additionally
/// admits `http://localhost` and loopback IP literals for local testing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPolicy {
    /// Accept plain HTTP for loopback hosts.
    #[serde(default)]
    pub allow_http_loopback: bool,
}

impl UrlPolicy {
    /// HTTPS only.
    pub fn strict() -> Self {
        Self::default()
    }

    /// HTTPS, plus HTTP on loopback hosts.
    pub fn with_http_loopback() -> Self {
        Self {
            allow_http_loopback: true,
        }
    }

    /// Checks that `url` may be fetched or trusted under this policy.
    pub fn check(&self, url: &Url) -> Result<(), String> {
        match url.scheme() {
            "https" => {}
            "http" if self.allow_http_loopback && is_loopback(url) => {}
            other => return Err(format!("scheme must be https, got \"{other}\"")),
        }
        if url.host().is_none() {
            return Err("URL has no host".to_string());
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err("URL must not carry credentials".to_string());
        }
        Ok(())
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => addr.is_loopback(),
        Some(Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

/// Serialized web origin, e.g. `https://alicepay.com`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin(String);

impl Origin {
    /// Origin of an absolute URL. Opaque origins (`data:`, `file:`) yield `None`.
    pub fn of(url: &Url) -> Option<Self> {
        let origin = url.origin();
        origin
            .is_tuple()
            .then(|| Self(origin.ascii_serialization()))
    }

    /// Parses a bare origin string under `policy`.
    ///
    /// Rejects anything carrying a path, query, fragment or credentials.
    pub fn parse(raw: &str, policy: UrlPolicy) -> Result<Self, String> {
        let url = Url::parse(raw).map_err(|e| format!("not an absolute URL: {e}"))?;
        policy.check(&url)?;
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err("origin must not have a path, query or fragment".to_string());
        }
        Self::of(&url).ok_or_else(|| "opaque origin".to_string())
    }

    /// Get the serialized origin.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Origin {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value, UrlPolicy::with_http_loopback())
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}

/// Origins a payment method manifest delegates to.
///
/// A `"*"` wildcard in a manifest is represented as [`OriginSet::None`]; it
/// cannot be bound to any particular origin and therefore authorizes nobody.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OriginSet {
    /// Explicitly listed origins.
    Explicit(BTreeSet<Origin>),
    /// No delegation.
    #[default]
    None,
}

impl OriginSet {
    /// Whether `candidate` is explicitly listed.
    pub fn covers(&self, candidate: &Origin) -> bool {
        covers(self, candidate)
    }

    /// Whether the set delegates to nobody.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Explicit(origins) => origins.is_empty(),
            Self::None => true,
        }
    }

    /// Number of listed origins.
    pub fn len(&self) -> usize {
        match self {
            Self::Explicit(origins) => origins.len(),
            Self::None => 0,
        }
    }
}

/// Whether `supported` covers `candidate` by exact origin equality.
pub fn covers(supported: &OriginSet, candidate: &Origin) -> bool {
    match supported {
        OriginSet::Explicit(origins) => origins.contains(candidate),
        OriginSet::None => false,
    }
}
