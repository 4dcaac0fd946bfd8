//! Multi-touch attribution service.
//!
//! Main entry point: initializes tracing, loads configuration, builds the
//! engine and reporting aggregator, and starts the HTTP + metrics servers.

use std::sync::Arc;

use attrib_api::ApiServer;
use attrib_core::config::AppConfig;
use attrib_engine::AttributionEngine;
use attrib_reporting::ReportingAggregator;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "attrib-server")]
#[command(about = "Multi-touch attribution engine and reporting API")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "ATTRIB__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "ATTRIB__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "ATTRIB__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Default lookback window in days (overrides config)
    #[arg(long, env = "ATTRIB__ATTRIBUTION__DEFAULT_LOOKBACK_DAYS")]
    lookback_days: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attrib_server=info,attrib_engine=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Attribution service starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if let Some(days) = cli.lookback_days {
        config.attribution.default_lookback_days = days;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        lookback_days = config.attribution.default_lookback_days,
        "Configuration loaded"
    );

    let engine = Arc::new(AttributionEngine::with_config(&config.attribution));
    let aggregator = Arc::new(ReportingAggregator::new(engine.store()));

    let server = ApiServer::new(config.clone(), engine, aggregator);

    if config.metrics.enabled {
        server.start_metrics()?;
    }

    server.start_http().await
}
