//! covboost CLI entry point.

use clap::Parser;

use covboost::cli::{handle_error, Cli};
use covboost::infrastructure::config::ConfigLoader;
use covboost::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err.context("Failed to load configuration"), cli.json),
    };
    cli.apply_overrides(&mut config);
    if let Err(err) = ConfigLoader::validate(&config) {
        handle_error(err.into(), cli.json);
    }

    // Hold the guard so buffered file logs are flushed on exit.
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    tracing::debug!(
        workspace = %config.workspace_dir.display(),
        output_dir = %config.output_dir.display(),
        "Configuration loaded"
    );

    if let Err(err) = covboost::cli::commands::execute(cli.command, &config, cli.json).await {
        handle_error(err, cli.json);
    }
}
