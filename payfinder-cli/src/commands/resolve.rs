//! Resolve command - find the apps authorized for a set of methods

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use payfinder_lib::{
    InMemoryAppRegistry, Origin, PaymentAppFinder, PaymentOptions, Provenance, ResolutionOutcome,
    ResolutionRequest, UrlPolicy,
};
use serde_json::json;

use super::CliConfig;
use crate::ui;

/// Arguments of `payfinder resolve`.
#[derive(Clone, Debug, Default)]
pub struct ResolveArgs {
    /// JSON array of installed apps.
    pub registry: std::path::PathBuf,
    /// Merchant origin.
    pub merchant: String,
    /// Requested method identifiers.
    pub methods: Vec<String>,
    /// Requested payer details.
    pub options: PaymentOptions,
    /// Treat the request as coming from a trusted context.
    pub trusted_context: bool,
    /// Print the outcome as JSON.
    pub json: bool,
}

#[tracing::instrument(skip(args, config), fields(merchant = %args.merchant))]
pub async fn run(args: ResolveArgs, config: CliConfig, verbose: bool) -> Result<()> {
    let registry = load_registry(&args.registry)?;
    let merchant = parse_merchant(&args.merchant, config.finder.url_policy)?;

    if verbose {
        ui::info(&format!("Registry: {} app(s)", registry.len()));
        ui::info(&format!("Merchant: {}", merchant));
    }

    let finder = PaymentAppFinder::with_http_fetcher(
        Arc::new(registry),
        config.finder,
        config.fetcher,
    )?;
    let request = ResolutionRequest::new(merchant, args.methods)
        .with_options(args.options)
        .with_trusted_context(args.trusted_context);

    let spinner = ui::spinner("Resolving payment apps...");
    let outcome = finder.resolve(request).await;
    spinner.finish_and_clear();

    if args.json {
        ui::json(&outcome_json(&outcome));
        return Ok(());
    }

    print_outcome(&outcome, verbose);
    Ok(())
}

/// Load a JSON app registry from `path`.
pub fn load_registry(path: &Path) -> Result<InMemoryAppRegistry> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read registry {}", path.display()))?;
    Ok(InMemoryAppRegistry::from_json(&json)?)
}

/// Parse the merchant origin. A trailing slash is accepted.
pub fn parse_merchant(raw: &str, policy: UrlPolicy) -> Result<Origin> {
    Origin::parse(raw.trim(), policy).map_err(|reason| anyhow!("Invalid merchant origin \"{raw}\": {reason}"))
}

/// Short human-readable form of a provenance.
pub fn describe_provenance(provenance: &Provenance) -> String {
    match provenance {
        Provenance::SelfDeclared => "self-declared".to_string(),
        Provenance::DefaultApplication { manifest } => format!("default application ({manifest})"),
        Provenance::SupportedOrigin { origin } => format!("supported origin ({origin})"),
        Provenance::StoreBilling => "store billing".to_string(),
    }
}

/// JSON document printed by `--json`.
pub fn outcome_json(outcome: &ResolutionOutcome) -> serde_json::Value {
    json!({
        "status": outcome.status,
        "apps": outcome.apps,
        "errors": outcome.user_error_messages(),
    })
}

fn print_outcome(outcome: &ResolutionOutcome, verbose: bool) {
    ui::header("Payment Apps");

    if outcome.apps.is_empty() {
        ui::info("No authorized payment apps found");
    } else {
        ui::success(&format!("Found {} app(s)", outcome.apps.len()));
        for app in &outcome.apps {
            ui::separator();
            let title = match &app.app.label {
                Some(label) => format!("{label} ({})", app.package_name()),
                None => app.package_name().to_string(),
            };
            println!("{}", title);
            for (method, provenance) in &app.methods {
                ui::key_value(method.as_str(), &describe_provenance(provenance));
            }
            if app.ready_to_pay_service {
                ui::key_value("ready-to-pay", "yes");
            }
        }
    }

    for message in outcome.user_error_messages() {
        ui::warning(&message);
    }

    if verbose {
        for error in &outcome.errors {
            ui::info(&format!("{:?}: {}", error.code(), error));
        }
    }
}
