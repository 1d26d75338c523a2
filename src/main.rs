//! Lipi - Romanized Nepali to Devanagari transliteration chat
//!
//! Main entry point for the Lipi command-line application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lipi::cli::{Cli, Commands};
use lipi::commands;
use lipi::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, cli.command.generation_args())?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { .. } => commands::chat::run_chat(config).await,
        Commands::Once { text, .. } => {
            tracing::info!("Running one-shot transliteration");
            commands::once::run_once(config, &text.join(" ")).await
        }
        Commands::Params { .. } => commands::params::run_params(&config),
    }
}

/// Initialize tracing/logging
///
/// Logs go to stderr so they never interleave with streamed output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "lipi=debug" } else { "lipi=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
