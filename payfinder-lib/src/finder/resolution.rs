//! A single resolution pass.
//!
//! The pass task owns all state. Downloads run in a [`JoinSet`] and only
//! hand their parsed result back; nothing is shared between tasks and
//! nothing outlives the pass.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument};
use url::Url;

use super::{
    FinderConfig, FinderContext, Provenance, ResolutionOutcome, ResolutionRequest,
    ResolutionStatus, ResolvedApp,
};
use crate::billing;
use crate::errors::FinderError;
use crate::fetcher::ManifestFetcher;
use crate::fingerprint;
use crate::manifest::{ManifestParser, PaymentMethodManifest, WebAppManifestSection};
use crate::method::MethodIdentifier;
use crate::origin::Origin;
use crate::registry::CandidateApp;

pub(super) async fn run(
    context: Arc<FinderContext>,
    request: ResolutionRequest,
    shutdown: watch::Receiver<bool>,
) -> ResolutionOutcome {
    if *shutdown.borrow() {
        return ResolutionOutcome::cancelled();
    }

    let span = tracing::info_span!(
        "resolve",
        merchant = %request.merchant_origin,
        methods = request.methods.len()
    );
    run_pass(context, request, shutdown).instrument(span).await
}

async fn run_pass(
    context: Arc<FinderContext>,
    request: ResolutionRequest,
    mut shutdown: watch::Receiver<bool>,
) -> ResolutionOutcome {
    let mut pass = Pass::new(Arc::clone(&context), request);
    if pass.methods.is_empty() {
        debug!("no valid methods requested");
        return pass.finish(Vec::new());
    }

    // Init: snapshot candidates once.
    let all_methods = pass.methods.all();
    let Some(candidates) =
        unless_shut_down(&mut shutdown, context.registry.list_candidates(&all_methods)).await
    else {
        return ResolutionOutcome::cancelled();
    };
    pass.set_candidates(candidates);

    pass.local_pass();

    let mut downloads = Downloads::new(&context, pass.request.merchant_origin.clone());
    pass.dispatch_method_manifests(&mut downloads);

    loop {
        let next = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => None,
            next = downloads.tasks.join_next() => Some(next),
        };
        let Some(next) = next else {
            debug!(in_flight = downloads.tasks.len(), "aborting downloads");
            downloads.tasks.abort_all();
            return ResolutionOutcome::cancelled();
        };
        match next {
            None => break,
            Some(Ok(downloaded)) => {
                if let Some(url) = downloads.settle(downloaded, &mut pass.errors) {
                    pass.on_method_manifest(&url, &mut downloads);
                }
            }
            Some(Err(e)) => warn!(error = %e, "download task failed"),
        }
    }

    pass.aggregate(&downloads);

    let mut apps = Vec::with_capacity(pass.grants.len());
    for (package_name, methods) in std::mem::take(&mut pass.grants) {
        let Some(app) = pass.candidates.get(&package_name).cloned() else {
            continue;
        };
        let ready_to_pay_service = if app.has_ready_to_pay_service
            || context.config.bypass_ready_to_pay_check
        {
            app.has_ready_to_pay_service
        } else {
            let Some(ready) = unless_shut_down(
                &mut shutdown,
                context.registry.has_ready_to_pay_service(&package_name),
            )
            .await
            else {
                return ResolutionOutcome::cancelled();
            };
            ready
        };
        apps.push(ResolvedApp {
            app,
            methods,
            ready_to_pay_service,
        });
    }

    if *shutdown.borrow() {
        return ResolutionOutcome::cancelled();
    }
    pass.finish(apps)
}

/// Runs `future` unless the finder shuts down first.
async fn unless_shut_down<F: Future>(
    shutdown: &mut watch::Receiver<bool>,
    future: F,
) -> Option<F::Output> {
    if *shutdown.borrow() {
        return None;
    }
    tokio::select! {
        biased;
        _ = wait_for_shutdown(shutdown) => None,
        output = future => Some(output),
    }
}

/// Resolves once shutdown is signalled or the finder is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}

// ============================================================================
// Requested methods
// ============================================================================

#[derive(Default)]
struct RequestedMethods {
    keywords: Vec<MethodIdentifier>,
    urls: Vec<MethodIdentifier>,
    billing: Vec<MethodIdentifier>,
}

impl RequestedMethods {
    fn classify(raw: &[String], config: &FinderConfig, errors: &mut Vec<FinderError>) -> Self {
        let mut seen = BTreeSet::new();
        let mut methods = Self::default();

        for raw in raw {
            let method = match MethodIdentifier::parse(raw, &config.keywords, config.url_policy) {
                Ok(method) => method,
                Err(e) => {
                    warn!(identifier = %raw, error = %e, "rejecting method identifier");
                    errors.push(e);
                    continue;
                }
            };
            if !seen.insert(method.clone()) {
                continue;
            }
            if config.billing.is_billing_method(&method) {
                methods.billing.push(method);
            } else if method.is_url() {
                methods.urls.push(method);
            } else {
                methods.keywords.push(method);
            }
        }
        methods
    }

    fn all(&self) -> Vec<MethodIdentifier> {
        self.keywords
            .iter()
            .chain(&self.urls)
            .chain(&self.billing)
            .cloned()
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.urls.is_empty() && self.billing.is_empty()
    }

    fn is_requested_url(&self, url: &Url) -> bool {
        self.urls.iter().any(|method| method.as_url() == Some(url))
    }
}

// ============================================================================
// Downloads
// ============================================================================

enum Slot<T> {
    Pending,
    Ready(T),
    Failed,
}

enum Downloaded {
    MethodManifest(Url, Result<PaymentMethodManifest, FinderError>),
    WebAppManifest(Url, Result<Vec<WebAppManifestSection>, FinderError>),
}

/// Per-pass download bookkeeping. Each URL is requested at most once.
struct Downloads {
    fetcher: Arc<dyn ManifestFetcher>,
    parser: ManifestParser,
    merchant: Origin,
    tasks: JoinSet<Downloaded>,
    method_manifests: HashMap<Url, Slot<PaymentMethodManifest>>,
    web_app_manifests: HashMap<Url, Slot<Vec<WebAppManifestSection>>>,
}

impl Downloads {
    fn new(context: &FinderContext, merchant: Origin) -> Self {
        Self {
            fetcher: Arc::clone(&context.fetcher),
            parser: context.parser.clone(),
            merchant,
            tasks: JoinSet::new(),
            method_manifests: HashMap::new(),
            web_app_manifests: HashMap::new(),
        }
    }

    fn request_method_manifest(&mut self, url: &Url) {
        if self.method_manifests.contains_key(url) {
            return;
        }
        debug!(url = %url, "downloading payment method manifest");
        self.method_manifests.insert(url.clone(), Slot::Pending);

        let fetcher = Arc::clone(&self.fetcher);
        let parser = self.parser.clone();
        let merchant = self.merchant.clone();
        let url = url.clone();
        self.tasks.spawn(async move {
            let result = match fetcher.fetch_payment_method_manifest(&merchant, &url).await {
                Ok(bytes) => parser
                    .parse_payment_method_manifest(&url, &bytes)
                    .map_err(|e| FinderError::parse(url.as_str(), e)),
                Err(e) => Err(FinderError::Fetch(e)),
            };
            Downloaded::MethodManifest(url, result)
        });
    }

    fn request_web_app_manifest(&mut self, url: &Url) {
        if self.web_app_manifests.contains_key(url) {
            return;
        }
        debug!(url = %url, "downloading web app manifest");
        self.web_app_manifests.insert(url.clone(), Slot::Pending);

        let fetcher = Arc::clone(&self.fetcher);
        let parser = self.parser.clone();
        let merchant = self.merchant.clone();
        let url = url.clone();
        self.tasks.spawn(async move {
            let result = match fetcher.fetch(&merchant, &url).await {
                Ok(bytes) => parser
                    .parse_web_app_manifest(&bytes)
                    .map_err(|e| FinderError::parse(url.as_str(), e)),
                Err(e) => Err(FinderError::Fetch(e)),
            };
            Downloaded::WebAppManifest(url, result)
        });
    }

    /// Records a finished download. Returns the URL of a newly parsed
    /// payment method manifest, whose follow-up downloads are still due.
    fn settle(&mut self, downloaded: Downloaded, errors: &mut Vec<FinderError>) -> Option<Url> {
        match downloaded {
            Downloaded::MethodManifest(url, Ok(manifest)) => {
                debug!(
                    url = %url,
                    default_applications = manifest.default_applications.len(),
                    supported_origins = manifest.supported_origins.len(),
                    wildcard = manifest.wildcard_origins,
                    "payment method manifest parsed"
                );
                self.method_manifests.insert(url.clone(), Slot::Ready(manifest));
                Some(url)
            }
            Downloaded::WebAppManifest(url, Ok(sections)) => {
                debug!(url = %url, sections = sections.len(), "web app manifest parsed");
                self.web_app_manifests.insert(url, Slot::Ready(sections));
                None
            }
            Downloaded::MethodManifest(url, Err(e)) => {
                warn!(url = %url, error = %e, "payment method manifest unavailable");
                self.method_manifests.insert(url, Slot::Failed);
                errors.push(e);
                None
            }
            Downloaded::WebAppManifest(url, Err(e)) => {
                warn!(url = %url, error = %e, "web app manifest unavailable");
                self.web_app_manifests.insert(url, Slot::Failed);
                errors.push(e);
                None
            }
        }
    }

    fn method_manifest(&self, url: &Url) -> Option<&PaymentMethodManifest> {
        match self.method_manifests.get(url) {
            Some(Slot::Ready(manifest)) => Some(manifest),
            Some(Slot::Pending | Slot::Failed) | None => None,
        }
    }

    fn web_app_sections(&self, url: &Url) -> Option<&[WebAppManifestSection]> {
        match self.web_app_manifests.get(url) {
            Some(Slot::Ready(sections)) => Some(sections.as_slice()),
            Some(Slot::Pending | Slot::Failed) | None => None,
        }
    }

    /// The first `default_applications` entry whose sections vouch for `app`.
    fn default_application_match(
        &self,
        app: &CandidateApp,
        manifest: &PaymentMethodManifest,
    ) -> Option<Url> {
        manifest
            .default_applications
            .iter()
            .find(|web_app| {
                self.web_app_sections(web_app).is_some_and(|sections| {
                    sections.iter().any(|section| section_matches(app, section))
                })
            })
            .cloned()
    }
}

fn section_matches(app: &CandidateApp, section: &WebAppManifestSection) -> bool {
    if section.package_name != app.package_name {
        return false;
    }
    if section.min_version > app.version {
        debug!(
            package = %app.package_name,
            installed = app.version,
            min_version = section.min_version,
            "installed version too old"
        );
        return false;
    }
    let matched = fingerprint::matches(&app.signing_fingerprints, &section.fingerprints);
    if !matched {
        debug!(package = %app.package_name, "signature mismatch");
    }
    matched
}

// ============================================================================
// Pass state
// ============================================================================

struct Pass {
    context: Arc<FinderContext>,
    request: ResolutionRequest,
    methods: RequestedMethods,
    candidates: BTreeMap<String, CandidateApp>,
    grants: BTreeMap<String, BTreeMap<MethodIdentifier, Provenance>>,
    errors: Vec<FinderError>,
}

impl Pass {
    fn new(context: Arc<FinderContext>, request: ResolutionRequest) -> Self {
        let mut errors = Vec::new();
        let methods = RequestedMethods::classify(&request.methods, &context.config, &mut errors);
        Self {
            context,
            request,
            methods,
            candidates: BTreeMap::new(),
            grants: BTreeMap::new(),
            errors,
        }
    }

    fn set_candidates(&mut self, candidates: Vec<CandidateApp>) {
        for app in candidates {
            if self.candidates.contains_key(&app.package_name) {
                warn!(package = %app.package_name, "duplicate candidate ignored");
                continue;
            }
            self.candidates.insert(app.package_name.clone(), app);
        }
        debug!(candidates = self.candidates.len(), "candidates snapshotted");
    }

    fn grant(&mut self, package_name: &str, method: &MethodIdentifier, provenance: Provenance) {
        debug!(package = %package_name, method = %method, ?provenance, "method granted");
        self.grants
            .entry(package_name.to_string())
            .or_default()
            .entry(method.clone())
            .or_insert(provenance);
    }

    fn is_granted(&self, package_name: &str, method: &MethodIdentifier) -> bool {
        self.grants
            .get(package_name)
            .is_some_and(|methods| methods.contains_key(method))
    }

    /// Apps that declare `method` but are not yet authorized for it.
    fn claimants(&self, method: &MethodIdentifier) -> Vec<&CandidateApp> {
        self.candidates
            .values()
            .filter(|app| app.declares(method) && !self.is_granted(&app.package_name, method))
            .collect()
    }

    /// The app's default method, if it is a fetchable URL method.
    fn default_url_method(&self, app: &CandidateApp) -> Option<MethodIdentifier> {
        let config = &self.context.config;
        let raw = app.default_method.as_deref()?;
        let method = MethodIdentifier::parse(raw, &config.keywords, config.url_policy).ok()?;
        (method.is_url() && !config.billing.is_billing_method(&method)).then_some(method)
    }

    fn local_pass(&mut self) {
        let mut local = Vec::new();
        for app in self.candidates.values() {
            for keyword in &self.methods.keywords {
                if app.declares(keyword) {
                    local.push((app.package_name.clone(), keyword.clone()));
                }
            }
            if !app.is_self_verified() {
                continue;
            }
            for method in &self.methods.urls {
                if app.declares(method) {
                    local.push((app.package_name.clone(), method.clone()));
                }
            }
        }
        for (package_name, method) in local {
            self.grant(&package_name, &method, Provenance::SelfDeclared);
        }
    }

    fn dispatch_method_manifests(&self, downloads: &mut Downloads) {
        for method in &self.methods.urls {
            let Some(url) = method.as_url() else {
                continue;
            };
            if self.claimants(method).is_empty() {
                debug!(method = %method, "no unverified claimants, skipping download");
                continue;
            }
            downloads.request_method_manifest(url);
        }
    }

    /// Schedules the downloads a freshly parsed method manifest calls for.
    fn on_method_manifest(&self, url: &Url, downloads: &mut Downloads) {
        let Some(manifest) = downloads.method_manifest(url) else {
            return;
        };
        let web_apps = manifest.default_applications.clone();
        let mut default_methods = Vec::new();

        if self.methods.is_requested_url(url) {
            let method = MethodIdentifier::Url(url.clone());
            for app in self.claimants(&method) {
                let Some(default_method) = self.origin_delegate_default(app, &method, manifest)
                else {
                    continue;
                };
                if app.is_self_verified() && app.declares_default(&default_method) {
                    continue;
                }
                if let Some(default_url) = default_method.as_url() {
                    default_methods.push(default_url.clone());
                }
            }
        }

        for web_app in &web_apps {
            downloads.request_web_app_manifest(web_app);
        }
        for default_url in &default_methods {
            downloads.request_method_manifest(default_url);
        }
    }

    /// Whether `app` is verified for its own default method.
    fn verified_for_default(
        &self,
        app: &CandidateApp,
        default_method: &MethodIdentifier,
        downloads: &Downloads,
    ) -> bool {
        if app.is_self_verified() && app.declares_default(default_method) {
            return true;
        }
        default_method
            .as_url()
            .and_then(|url| downloads.method_manifest(url))
            .is_some_and(|manifest| downloads.default_application_match(app, manifest).is_some())
    }

    /// The app's default method, when `manifest` delegates `method` to the
    /// merchant origin and the app is registered under that origin.
    fn origin_delegate_default(
        &self,
        app: &CandidateApp,
        method: &MethodIdentifier,
        manifest: &PaymentMethodManifest,
    ) -> Option<MethodIdentifier> {
        let merchant = &self.request.merchant_origin;
        if !manifest.supported_origins.covers(merchant) {
            return None;
        }
        let default_method = self.default_url_method(app)?;
        if &default_method == method || default_method.origin().as_ref() != Some(merchant) {
            return None;
        }
        Some(default_method)
    }

    fn supported_origin_match(
        &self,
        app: &CandidateApp,
        method: &MethodIdentifier,
        manifest: &PaymentMethodManifest,
        downloads: &Downloads,
    ) -> Option<Origin> {
        let default_method = self.origin_delegate_default(app, method, manifest)?;
        self.verified_for_default(app, &default_method, downloads)
            .then(|| self.request.merchant_origin.clone())
    }

    fn aggregate(&mut self, downloads: &Downloads) {
        let mut delegated = Vec::new();
        for method in &self.methods.urls {
            let Some(manifest) = method.as_url().and_then(|url| downloads.method_manifest(url))
            else {
                continue;
            };
            for app in self.claimants(method) {
                if let Some(web_app) = downloads.default_application_match(app, manifest) {
                    delegated.push((
                        app.package_name.clone(),
                        method.clone(),
                        Provenance::DefaultApplication { manifest: web_app },
                    ));
                } else if let Some(origin) =
                    self.supported_origin_match(app, method, manifest, downloads)
                {
                    delegated.push((
                        app.package_name.clone(),
                        method.clone(),
                        Provenance::SupportedOrigin { origin },
                    ));
                }
            }
        }
        for (package_name, method, provenance) in delegated {
            self.grant(&package_name, &method, provenance);
        }

        if self.methods.billing.is_empty() {
            return;
        }
        let requests_delegation = self.request.options.requests_delegation();
        let mut billing_grants = Vec::new();
        for app in self.candidates.values() {
            for method in billing::allowed_billing_methods(
                app,
                &self.methods.billing,
                self.request.trusted_context,
                requests_delegation,
                &self.context.config.billing,
            ) {
                billing_grants.push((app.package_name.clone(), method));
            }
        }
        for (package_name, method) in billing_grants {
            self.grant(&package_name, &method, Provenance::StoreBilling);
        }
    }

    fn finish(self, apps: Vec<ResolvedApp>) -> ResolutionOutcome {
        info!(
            apps = apps.len(),
            errors = self.errors.len(),
            "resolution complete"
        );
        ResolutionOutcome {
            status: ResolutionStatus::Completed,
            apps,
            errors: self.errors,
        }
    }
}
