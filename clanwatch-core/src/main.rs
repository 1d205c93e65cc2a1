//! clanwatch - clan member tenure and performance scoring service
//!
//! Serves the aggregation operations over HTTP. Configuration resolves from
//! command line, environment, TOML file, then compiled defaults.

use anyhow::{Context, Result};
use clanwatch_common::config::{locate_config_file, CliOverrides, TomlConfig};
use clanwatch_core::client::HttpClanApi;
use clanwatch_core::{build_aggregator, build_router, resolve_config, AppState};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "clanwatch", version, about = "Clan member tenure and performance scoring")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "CLANWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5740
    #[arg(long, env = "CLANWATCH_BIND")]
    bind: Option<String>,

    /// Upstream API base URL
    #[arg(long, env = "CLANWATCH_BASE_URL")]
    base_url: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "CLANWATCH_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            bind: self.bind.clone(),
            base_url: self.base_url.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

/// RUST_LOG wins over the configured level
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = cli.overrides();

    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.log_level.as_deref().unwrap_or("info")))
        .finish();
    let config: TomlConfig =
        resolve_config(&overrides, bootstrap).context("Failed to resolve configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config.logging.level))
        .init();

    info!(
        "Starting clanwatch v{}",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(path) = locate_config_file(overrides.config_path.as_deref()) {
        info!(path = %path.display(), exists = path.exists(), "Configuration file");
    }

    let api_key = config.require_api_key()?;
    let api = HttpClanApi::new(&config.upstream, api_key)
        .context("Failed to build upstream client")?;
    info!(
        base_url = %config.upstream.base_url,
        requests_per_second = config.upstream.requests_per_second,
        "Upstream client ready"
    );

    let aggregator = build_aggregator(Arc::new(api), &config);
    info!(
        cache_ttl_secs = config.cache.ttl_secs,
        timeout_secs = config.aggregation.timeout_secs,
        "Aggregator ready"
    );

    let app = build_router(AppState::new(Arc::new(aggregator)));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("clanwatch listening on http://{}", config.server.bind);
    info!("Health check: http://{}/health", config.server.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
