//! Attribution API router. Mounts all engine endpoints under /api/v1 plus
//! the operational probes.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{self, AppState};

/// Build the attribution router with all endpoints.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Journey ingestion
        .route(
            "/api/v1/touchpoints",
            get(handlers::list_touchpoints).post(handlers::record_touchpoint),
        )
        .route("/api/v1/conversions", post(handlers::record_conversion))
        // Attribution
        .route(
            "/api/v1/attribution/calculate",
            post(handlers::calculate_attribution),
        )
        .route(
            "/api/v1/attribution/report",
            get(handlers::attribution_report),
        )
        .route(
            "/api/v1/attribution/channels",
            get(handlers::channel_comparison),
        )
        .route(
            "/api/v1/attribution/journey/:visitor_id",
            get(handlers::customer_journey),
        )
        .route("/api/v1/attribution/models", get(handlers::model_catalog))
        // Operational
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness))
        .route("/live", get(handlers::liveness))
        .with_state(state)
}
