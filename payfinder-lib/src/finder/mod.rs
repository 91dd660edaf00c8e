//! Payment app resolution.
//!
//! [`PaymentAppFinder`] answers one question: which installed apps are
//! authorized to handle the requested payment methods? Each call runs an
//! independent resolution pass:
//!
//! 1. **Init** - validate method identifiers and snapshot candidates.
//! 2. **Local pass** - grant keywords and self-declared URL methods.
//! 3. **Delegation pass** - download method manifests and the Web App
//!    Manifests they reference, concurrently and de-duplicated per pass.
//! 4. **Aggregate** - verify packages, versions and fingerprints, apply
//!    `supported_origins` and store billing, merge grants per package.
//! 5. **Emit** - only after every download has settled.
//!
//! Failures never escape a pass; they are collected in
//! [`ResolutionOutcome::errors`] and the affected paths simply grant nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use payfinder_lib::prelude::*;
//!
//! let registry = Arc::new(InMemoryAppRegistry::from_json(&apps_json)?);
//! let finder = PaymentAppFinder::with_http_fetcher(registry, FinderConfig::default(), FetcherConfig::default())?;
//!
//! let request = ResolutionRequest::new(merchant, ["https://bobpay.com/webpay", "basic-card"]);
//! let outcome = finder.resolve(request).await;
//! for app in &outcome.apps {
//!     println!("{} -> {:?}", app.package_name(), app.methods);
//! }
//! ```

pub mod config;
mod resolution;

pub use config::FinderConfig;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

use crate::errors::FinderError;
use crate::fetcher::ManifestFetcher;
use crate::manifest::ManifestParser;
use crate::method::MethodIdentifier;
use crate::origin::Origin;
use crate::registry::{AppRegistry, CandidateApp};

// ============================================================================
// Request
// ============================================================================

/// Merchant-requested payer details.
///
/// Any of these delegates data collection to the payment app, which rules
/// out store billing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct PaymentOptions {
    /// Shipping address requested.
    #[serde(default)]
    pub request_shipping: bool,
    /// Payer name requested.
    #[serde(default)]
    pub request_payer_name: bool,
    /// Payer email requested.
    #[serde(default)]
    pub request_payer_email: bool,
    /// Payer phone requested.
    #[serde(default)]
    pub request_payer_phone: bool,
}

impl PaymentOptions {
    /// Whether shipping or any contact detail is requested.
    pub fn requests_delegation(&self) -> bool {
        self.request_shipping
            || self.request_payer_name
            || self.request_payer_email
            || self.request_payer_phone
    }
}

/// One resolution request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionRequest {
    /// Origin of the page asking for payment.
    pub merchant_origin: Origin,
    /// Raw method identifiers as supplied by the merchant.
    pub methods: Vec<String>,
    /// Requested payer details.
    pub options: PaymentOptions,
    /// Whether the request comes from a trusted context (e.g. a store
    /// trusted web activity).
    pub trusted_context: bool,
}

impl ResolutionRequest {
    /// Create a request for `methods` on behalf of `merchant_origin`.
    pub fn new<I, S>(merchant_origin: Origin, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            merchant_origin,
            methods: methods.into_iter().map(Into::into).collect(),
            options: PaymentOptions::default(),
            trusted_context: false,
        }
    }

    /// Set the payment options.
    pub fn with_options(mut self, options: PaymentOptions) -> Self {
        self.options = options;
        self
    }

    /// Mark the request as coming from a trusted context.
    pub fn with_trusted_context(mut self, trusted: bool) -> Self {
        self.trusted_context = trusted;
        self
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Why an app may handle a method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// The app declares the method and its declared fingerprint matches its
    /// signature. Keywords are always self-declared.
    SelfDeclared,
    /// Listed by the method owner's `default_applications`, verified through
    /// this Web App Manifest.
    DefaultApplication {
        /// Web App Manifest that matched.
        manifest: Url,
    },
    /// The method owner lists the merchant origin in `supported_origins` and
    /// the app is registered and verified under that origin.
    SupportedOrigin {
        /// The merchant origin.
        origin: Origin,
    },
    /// Store billing in a trusted context.
    StoreBilling,
}

/// An app authorized for at least one requested method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedApp {
    /// The candidate snapshot.
    pub app: CandidateApp,
    /// Authorized methods and how each was established.
    pub methods: BTreeMap<MethodIdentifier, Provenance>,
    /// Whether a ready-to-pay service is available.
    pub ready_to_pay_service: bool,
}

impl ResolvedApp {
    /// Package identifier.
    pub fn package_name(&self) -> &str {
        &self.app.package_name
    }

    /// Whether the app was authorized for `method`.
    pub fn supports(&self, method: &MethodIdentifier) -> bool {
        self.methods.contains_key(method)
    }

    /// How `method` was authorized.
    pub fn provenance(&self, method: &MethodIdentifier) -> Option<&Provenance> {
        self.methods.get(method)
    }
}

/// How a pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Every dispatched download settled.
    Completed,
    /// The finder was shut down; nothing is reported.
    Cancelled,
}

/// Result of a resolution pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionOutcome {
    /// How the pass ended.
    pub status: ResolutionStatus,
    /// Authorized apps, sorted by package name.
    pub apps: Vec<ResolvedApp>,
    /// Contained failures, in the order they were observed.
    pub errors: Vec<FinderError>,
}

impl ResolutionOutcome {
    pub(crate) fn cancelled() -> Self {
        Self {
            status: ResolutionStatus::Cancelled,
            apps: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Whether the pass was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == ResolutionStatus::Cancelled
    }

    /// The resolved app for `package_name`.
    pub fn app(&self, package_name: &str) -> Option<&ResolvedApp> {
        self.apps.iter().find(|app| app.package_name() == package_name)
    }

    /// User-facing messages for failed downloads.
    pub fn user_error_messages(&self) -> Vec<String> {
        self.errors.iter().filter_map(FinderError::user_message).collect()
    }
}

/// Receives the results of [`PaymentAppFinder::find_apps`].
///
/// Callbacks run on the resolution task and should return quickly.
pub trait PaymentAppFinderDelegate: Send + Sync {
    /// An authorized app, once per package.
    fn on_app_found(&self, app: ResolvedApp);

    /// A user-facing download failure message.
    fn on_error_message(&self, _message: String) {}

    /// All results have been delivered.
    fn on_resolution_complete(&self);
}

// ============================================================================
// Finder
// ============================================================================

pub(crate) struct FinderContext {
    pub(crate) registry: Arc<dyn AppRegistry>,
    pub(crate) fetcher: Arc<dyn ManifestFetcher>,
    pub(crate) config: FinderConfig,
    pub(crate) parser: ManifestParser,
}

/// Resolves which installed apps may handle requested payment methods.
///
/// Passes are independent: overlapping calls share no downloads. Dropping
/// the finder, or calling [`shutdown`](Self::shutdown), cancels every pass
/// still running and suppresses all further reporting.
pub struct PaymentAppFinder {
    context: Arc<FinderContext>,
    shutdown: watch::Sender<bool>,
}

impl PaymentAppFinder {
    /// Create a finder over `registry` and `fetcher`.
    pub fn new(
        registry: Arc<dyn AppRegistry>,
        fetcher: Arc<dyn ManifestFetcher>,
        config: FinderConfig,
    ) -> Self {
        let parser = config.parser();
        let (shutdown, _) = watch::channel(false);
        Self {
            context: Arc::new(FinderContext {
                registry,
                fetcher,
                config,
                parser,
            }),
            shutdown,
        }
    }

    /// Create a finder that downloads manifests over HTTPS.
    #[cfg(feature = "http-fetcher")]
    pub fn with_http_fetcher(
        registry: Arc<dyn AppRegistry>,
        config: FinderConfig,
        fetcher_config: crate::fetcher::FetcherConfig,
    ) -> crate::Result<Self> {
        let fetcher = crate::fetcher::HttpManifestFetcher::new(fetcher_config)?;
        Ok(Self::new(registry, Arc::new(fetcher), config))
    }

    /// Get the configuration.
    pub fn config(&self) -> &FinderConfig {
        &self.context.config
    }

    /// Run a resolution pass and return its outcome.
    ///
    /// Returns a [`ResolutionStatus::Cancelled`] outcome with no apps if the
    /// finder is, or becomes, shut down.
    pub async fn resolve(&self, request: ResolutionRequest) -> ResolutionOutcome {
        resolution::run(
            Arc::clone(&self.context),
            request,
            self.shutdown.subscribe(),
        )
        .await
    }

    /// Run a resolution pass in the background, reporting to `delegate`.
    ///
    /// The delegate receives error messages, then one `on_app_found` per app
    /// in package order, then `on_resolution_complete`. Nothing is reported
    /// once the finder is shut down.
    pub fn find_apps(
        &self,
        request: ResolutionRequest,
        delegate: Arc<dyn PaymentAppFinderDelegate>,
    ) -> JoinHandle<()> {
        let context = Arc::clone(&self.context);
        let shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let outcome = resolution::run(context, request, shutdown.clone()).await;
            let is_shut_down = || *shutdown.borrow();

            if outcome.is_cancelled() || is_shut_down() {
                debug!("resolution cancelled, not reporting");
                return;
            }

            for message in outcome.user_error_messages() {
                if is_shut_down() {
                    return;
                }
                delegate.on_error_message(message);
            }
            for app in outcome.apps {
                if is_shut_down() {
                    return;
                }
                delegate.on_app_found(app);
            }
            if !is_shut_down() {
                delegate.on_resolution_complete();
            }
        })
    }

    /// Cancel all running passes and refuse new ones.
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            debug!("payment app finder shut down");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Drop for PaymentAppFinder {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
