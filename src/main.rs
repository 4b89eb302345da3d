//! Docportal - document analysis and Q&A client
//!
#![doc = "Docportal - document analysis and Q&A client"]
#![doc = "Main entry point for the docportal command-line application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docportal::cli::{Cli, Commands};
use docportal::commands;
use docportal::config::Config;
use docportal::error::PortalError;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {:?}", e);
        match e.downcast_ref::<PortalError>() {
            Some(portal_error) => eprintln!("Error: {}", portal_error.user_message()),
            None => eprintln!("Error: something went wrong. Run with --verbose for details."),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/docportal.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { upload } => {
            if !upload.is_empty() {
                tracing::debug!("Uploading {} file(s) before the first question", upload.len());
            }
            commands::chat::run_chat(config, upload).await
        }
        Commands::Analyze { files, json } => {
            tracing::info!("Starting document analysis");
            commands::analyze::run_analyze(config, files, json).await
        }
        Commands::Compare { a, b, json } => {
            tracing::info!("Starting document comparison");
            commands::compare::run_compare(config, a, b, json).await
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they do not interleave with the transcript.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "docportal=debug" } else { "docportal=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
