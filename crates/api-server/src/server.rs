//! HTTP server wiring for the attribution API, plus the Prometheus
//! metrics exporter on its own port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use attrib_core::config::AppConfig;
use attrib_engine::AttributionEngine;
use attrib_reporting::ReportingAggregator;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::AppState;
use crate::router::api_router;

pub struct ApiServer {
    config: AppConfig,
    engine: Arc<AttributionEngine>,
    aggregator: Arc<ReportingAggregator>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        engine: Arc<AttributionEngine>,
        aggregator: Arc<ReportingAggregator>,
    ) -> Self {
        Self {
            config,
            engine,
            aggregator,
        }
    }

    /// Start the HTTP REST server. Runs until the listener fails.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState {
            engine: self.engine.clone(),
            aggregator: self.aggregator.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
            max_query_limit: self.config.attribution.max_query_limit,
        };

        let app = api_router(state)
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);
        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on a separate port. Must be called from
    /// within the Tokio runtime.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
