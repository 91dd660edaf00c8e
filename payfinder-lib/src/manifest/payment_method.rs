use std::collections::BTreeSet;

use serde_json::Value;
use url::Url;

use super::{bounded_array, parse_root, MAX_DEFAULT_APPLICATIONS, MAX_SUPPORTED_ORIGINS};
use crate::errors::ParseError;
use crate::origin::{Origin, OriginSet, UrlPolicy};

/// Parsed Payment Method Manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentMethodManifest {
    /// Method URL the manifest was downloaded for.
    pub url: Url,
    /// Web App Manifests of the provider's own apps.
    pub default_applications: Vec<Url>,
    /// Origins whose apps may also handle this method.
    pub supported_origins: OriginSet,
    /// The document used the `"*"` wildcard. Recorded for diagnostics only.
    pub wildcard_origins: bool,
}

pub(super) fn parse(
    url: &Url,
    bytes: &[u8],
    policy: UrlPolicy,
) -> Result<PaymentMethodManifest, ParseError> {
    let root = parse_root(bytes)?;

    let default_applications = match root.get("default_applications") {
        Some(value) => parse_default_applications(value, policy)?,
        None => Vec::new(),
    };

    let (supported_origins, wildcard_origins) = match root.get("supported_origins") {
        Some(Value::String(s)) if s == "*" => (OriginSet::None, true),
        Some(value) => (parse_supported_origins(value, policy)?, false),
        None => (OriginSet::None, false),
    };

    Ok(PaymentMethodManifest {
        url: url.clone(),
        default_applications,
        supported_origins,
        wildcard_origins,
    })
}

fn parse_default_applications(value: &Value, policy: UrlPolicy) -> Result<Vec<Url>, ParseError> {
    const FIELD: &str = "default_applications";
    let items = bounded_array(value, FIELD, MAX_DEFAULT_APPLICATIONS)?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let field = format!("{FIELD}[{index}]");
            let raw = item
                .as_str()
                .ok_or_else(|| ParseError::invalid(&field, "expected a string"))?;
            let url = Url::parse(raw).map_err(|e| ParseError::invalid(&field, e.to_string()))?;
            policy
                .check(&url)
                .map_err(|reason| ParseError::invalid(&field, reason))?;
            Ok(url)
        })
        .collect()
}

fn parse_supported_origins(value: &Value, policy: UrlPolicy) -> Result<OriginSet, ParseError> {
    const FIELD: &str = "supported_origins";
    if value.is_string() {
        return Err(ParseError::invalid(FIELD, "only \"*\" is allowed as a string"));
    }
    let items = bounded_array(value, FIELD, MAX_SUPPORTED_ORIGINS)?;

    let mut origins = BTreeSet::new();
    for (index, item) in items.iter().enumerate() {
        let field = format!("{FIELD}[{index}]");
        let raw = item
            .as_str()
            .ok_or_else(|| ParseError::invalid(&field, "expected a string"))?;
        let origin = Origin::parse(raw, policy).map_err(|reason| ParseError::invalid(&field, reason))?;
        origins.insert(origin);
    }
    Ok(OriginSet::Explicit(origins))
}
