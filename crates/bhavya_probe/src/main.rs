use std::process::ExitCode;

use anyhow::Result;
use bhavya_api::{ApiClient, ApiConfig};
use bhavya_probe::{run, Cli};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ApiConfig::from_env()?;
    tracing::info!(base_url = %config.base_url, max_retries = config.max_retries, "configuration loaded");

    let client = ApiClient::new(config)?;
    let mut stdout = std::io::stdout().lock();
    run(&cli.command, &client, &mut stdout).await
}
