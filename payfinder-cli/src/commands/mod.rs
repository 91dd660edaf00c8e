//! Command implementations

pub mod fingerprint;
pub mod inspect;
pub mod resolve;

use std::path::Path;

use anyhow::{Context, Result};
use payfinder_lib::{FetcherConfig, FinderConfig};
use serde::Deserialize;

/// Contents of a `--config` file.
///
/// Both sections are optional; environment overrides are applied on top.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    /// Resolution engine settings.
    #[serde(default)]
    pub finder: FinderConfig,

    /// Manifest download settings.
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

impl CliConfig {
    /// Parse a configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid configuration file")
    }

    /// Load `path` if given, otherwise the defaults, then apply `PAYFINDER_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Self::from_json(&json)?
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    fn with_overrides<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            finder: self.finder.with_overrides(&lookup),
            fetcher: self.fetcher.with_overrides(&lookup),
        }
    }
}
