//! Payfinder CLI
//!
//! Resolve payment apps against a JSON app registry and inspect manifest
//! files from the command line.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use payfinder_cli::commands::{self, resolve::ResolveArgs, CliConfig};
use payfinder_cli::ui;
use payfinder_lib::PaymentOptions;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "payfinder")]
#[command(about = "Find the payment apps authorized to handle a payment method", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file with optional `finder` and `fetcher` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve which installed apps may handle the requested methods
    Resolve {
        /// JSON file listing the installed apps
        #[arg(short, long)]
        registry: PathBuf,

        /// Merchant origin, e.g. https://shop.example
        #[arg(short, long)]
        merchant: String,

        /// Payment method identifier (repeatable)
        #[arg(long = "method", required = true)]
        methods: Vec<String>,

        /// Request comes from a trusted context
        #[arg(long)]
        trusted_context: bool,

        /// Merchant requests a shipping address
        #[arg(long)]
        request_shipping: bool,

        /// Merchant requests the payer's name, email and phone
        #[arg(long)]
        request_contact: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a Payment Method Manifest file
    InspectMethodManifest {
        /// Manifest file
        file: PathBuf,

        /// Method URL the manifest belongs to
        #[arg(long)]
        url: String,
    },

    /// Parse a Web App Manifest file
    InspectWebAppManifest {
        /// Manifest file
        file: PathBuf,
    },

    /// Print the SHA-256 fingerprint of a DER signing certificate
    Fingerprint {
        /// Certificate file
        file: PathBuf,

        /// Fail unless the fingerprint equals this value
        #[arg(long)]
        expect: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("payfinder_cli=debug,payfinder_lib=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("payfinder_cli=info,payfinder_lib=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Resolve {
            registry,
            merchant,
            methods,
            trusted_context,
            request_shipping,
            request_contact,
            json,
        } => {
            let options = PaymentOptions {
                request_shipping,
                request_payer_name: request_contact,
                request_payer_email: request_contact,
                request_payer_phone: request_contact,
            };
            let args = ResolveArgs {
                registry,
                merchant,
                methods,
                options,
                trusted_context,
                json,
            };
            commands::resolve::run(args, config, cli.verbose).await?;
        }
        Commands::InspectMethodManifest { file, url } => {
            commands::inspect::method_manifest(&file, &url, &config)?;
        }
        Commands::InspectWebAppManifest { file } => {
            commands::inspect::web_app_manifest(&file, &config)?;
        }
        Commands::Fingerprint { file, expect } => {
            commands::fingerprint::run(&file, expect.as_deref(), cli.verbose)?;
        }
    }

    Ok(())
}
