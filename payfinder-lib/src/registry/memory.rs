//! In-memory app registry.
//!
//! Backs the CLI (loaded from a JSON file) and tests. Thread-safe and
//! shareable across tasks; lock poisoning is recovered from rather than
//! propagated.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{AppRegistry, CandidateApp};
use crate::method::MethodIdentifier;
use crate::{FinderError, Result};

/// Registry holding apps keyed by package name.
#[derive(Debug, Default)]
pub struct InMemoryAppRegistry {
    apps: RwLock<BTreeMap<String, CandidateApp>>,
}

impl InMemoryAppRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `apps`.
    pub fn from_apps(apps: impl IntoIterator<Item = CandidateApp>) -> Self {
        let registry = Self::new();
        for app in apps {
            registry.install(app);
        }
        registry
    }

    /// Loads a JSON array of apps.
    pub fn from_json(json: &str) -> Result<Self> {
        let apps: Vec<CandidateApp> = serde_json::from_str(json)
            .map_err(|e| FinderError::Config(format!("invalid app registry: {e}")))?;
        Ok(Self::from_apps(apps))
    }

    /// Installs an app, replacing any app with the same package name.
    pub fn install(&self, app: CandidateApp) -> Option<CandidateApp> {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        apps.insert(app.package_name.clone(), app)
    }

    /// Removes an app.
    pub fn uninstall(&self, package_name: &str) -> Option<CandidateApp> {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        apps.remove(package_name)
    }

    /// Gets an app by package name.
    pub fn get(&self, package_name: &str) -> Option<CandidateApp> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        apps.get(package_name).cloned()
    }

    /// Number of installed apps.
    pub fn len(&self) -> usize {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        apps.len()
    }

    /// Whether no apps are installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AppRegistry for InMemoryAppRegistry {
    async fn list_candidates(&self, methods: &[MethodIdentifier]) -> Vec<CandidateApp> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        apps.values()
            .filter(|app| methods.iter().any(|method| app.declares(method)))
            .cloned()
            .collect()
    }

    async fn has_ready_to_pay_service(&self, package_name: &str) -> bool {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        apps.get(package_name)
            .is_some_and(|app| app.has_ready_to_pay_service)
    }
}
