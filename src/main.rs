use anyhow::{Context, Result};
use clap::Parser;
use pacer::config_validator::ConfigValidator;
use pacer::{ApiClient, Config, HttpTransport, RequestScheduler};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fetch JSON resources while respecting the server's advertised rate limit
#[derive(Debug, Parser)]
#[command(name = "pacer", version, about)]
struct Args {
    /// Paths (joined onto the base URL) or absolute URLs to GET
    #[arg(required = true)]
    paths: Vec<String>,

    /// Base URL for relative paths; overrides PACER_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    /// JSON configuration file; environment variables are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra header sent with every request, as NAME:VALUE
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,

    /// Log level; overrides PACER_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path),
        None => Config::from_env(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    if let Some(base_url) = args.base_url.clone() {
        config.base_url = Some(base_url);
    }
    if let Some(level) = args.log_level.clone() {
        config.log_level = level;
    }
    ConfigValidator::validate_config(&config)
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("pacer={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(
        "Configuration: base_url={:?}, max_attempts={}, default_window={:?}",
        config.base_url,
        config.max_attempts,
        config.default_window
    );

    let scheduler = RequestScheduler::spawn(&config, Arc::new(HttpTransport::new()));
    let mut client = ApiClient::new(config.base_url.clone().unwrap_or_default(), scheduler.clone());
    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Header '{}' must look like NAME:VALUE", header))?;
        client = client.with_default_header(name.trim(), value.trim());
    }

    let calls = args.paths.iter().map(|path| {
        let client = client.clone();
        async move { (path, client.get::<Value>(path).await) }
    });
    let results = futures::future::join_all(calls).await;

    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
            Err(e) => {
                failures += 1;
                eprintln!("{}: {}", path, e);
            }
        }
    }

    let metrics = scheduler
        .metrics()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read metrics: {}", e))?;
    tracing::info!("Metrics: {}", serde_json::to_string(&metrics)?);

    if failures > 0 {
        anyhow::bail!("{} of {} requests failed", failures, args.paths.len());
    }

    Ok(())
}
