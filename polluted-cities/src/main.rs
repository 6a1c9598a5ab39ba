mod config;
mod telemetry;

use clap::Parser;
use config::{Config, ConfigError};
use std::path::PathBuf;
use std::process;

/// Serves the most polluted cities, ranked and described.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, short, default_value = "config.yaml")]
    config: PathBuf,

    /// Overrides `pollution_source.username`
    #[arg(long, env = "POLLUTION_API_USERNAME")]
    pollution_api_username: Option<String>,

    /// Overrides `pollution_source.password`
    #[arg(long, env = "POLLUTION_API_PASSWORD", hide_env_values = true)]
    pollution_api_password: Option<String>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Telemetry(#[from] telemetry::TelemetryError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("{0}")]
    Aggregator(#[from] aggregator::errors::AggregatorError),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("polluted-cities failed: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::from_file(&cli.config)?;
    config.override_credentials(cli.pollution_api_username, cli.pollution_api_password);

    let _sentry_guard = telemetry::init_logging(config.common.logging.as_ref())?;
    if let Some(metrics) = &config.common.metrics {
        telemetry::init_metrics(metrics)?;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(aggregator::run(config.aggregator))
        .inspect_err(|e| tracing::error!(error = %e, "Server stopped"))?;

    Ok(())
}
