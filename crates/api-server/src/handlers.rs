//! Axum REST handlers for the attribution API.
//!
//! Wire naming follows the surrounding dashboard conventions: query and
//! wrapper keys are camelCase, domain objects serialize snake_case.

use std::sync::Arc;
use std::time::Instant;

use attrib_core::error::AttributionError;
use attrib_core::types::{
    AttributionModel, AttributionResult, Conversion, GroupBy, ModelInfo, Touchpoint,
    TouchpointInput, ConversionInput, MODEL_CATALOG,
};
use attrib_engine::{AttributionEngine, TouchpointQuery};
use attrib_reporting::{AttributionReport, ChannelComparison, CustomerJourney, ReportingAggregator};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

/// Page size applied when the caller does not pass `limit`.
const DEFAULT_PAGE_LIMIT: usize = 100;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AttributionEngine>,
    pub aggregator: Arc<ReportingAggregator>,
    pub node_id: String,
    pub start_time: Instant,
    pub max_query_limit: usize,
}

// ─── Error mapping ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Engine errors mapped to HTTP statuses with a stable machine-readable
/// code; raw store errors never leak across the boundary.
pub struct ApiError(AttributionError);

impl From<AttributionError> for ApiError {
    fn from(err: AttributionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code() {
            "INVALID_INPUT" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        }
        let body = ErrorResponse {
            error: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Parse a comma-separated model list, silently dropping unknown ids.
fn parse_models(raw: Option<&str>) -> Vec<AttributionModel> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter_map(AttributionModel::parse)
            .collect()
    })
    .unwrap_or_default()
}

// ─── Touchpoints ───────────────────────────────────────────────────────────

/// POST /api/v1/touchpoints
pub async fn record_touchpoint(
    State(state): State<AppState>,
    Json(input): Json<TouchpointInput>,
) -> Result<(StatusCode, Json<Touchpoint>), ApiError> {
    let touchpoint = state.engine.record_touchpoint(input)?;
    metrics::counter!("attribution.touchpoints.recorded").increment(1);
    Ok((StatusCode::CREATED, Json(touchpoint)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchpointListParams {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub channel: Option<String>,
    pub campaign: Option<String>,
    pub source: Option<String>,
    pub visitor_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
pub struct TouchpointPage {
    pub touchpoints: Vec<Touchpoint>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// GET /api/v1/touchpoints
///
/// With `visitorId` the full visitor sequence is returned (only `limit`
/// applies); otherwise `start` and `end` are required and the result is a
/// page plus the total match count.
pub async fn list_touchpoints(
    State(state): State<AppState>,
    Query(params): Query<TouchpointListParams>,
) -> Result<Json<TouchpointPage>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .min(state.max_query_limit);

    if let Some(visitor_id) = &params.visitor_id {
        let touchpoints =
            state
                .engine
                .store()
                .get_touchpoints(visitor_id, params.start, params.end, Some(limit));
        let total = touchpoints.len();
        return Ok(Json(TouchpointPage {
            touchpoints,
            total,
            limit,
            offset: 0,
        }));
    }

    let (start, end) = match (params.start, params.end) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(AttributionError::InvalidInput(
                "start and end are required unless visitorId is given".to_string(),
            )
            .into())
        }
    };
    let offset = params.offset.unwrap_or(0);
    let (touchpoints, total) = state.engine.store().query_touchpoints(&TouchpointQuery {
        start,
        end,
        channel: params.channel,
        campaign: params.campaign,
        source: params.source,
        limit,
        offset,
    });
    Ok(Json(TouchpointPage {
        touchpoints,
        total,
        limit,
        offset,
    }))
}

// ─── Conversions ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub conversion: Conversion,
    pub touchpoint_count: usize,
}

/// POST /api/v1/conversions
pub async fn record_conversion(
    State(state): State<AppState>,
    Json(input): Json<ConversionInput>,
) -> Result<(StatusCode, Json<ConversionResponse>), ApiError> {
    let (conversion, touchpoint_count) = state.engine.record_conversion(input)?;
    metrics::counter!("attribution.conversions.recorded").increment(1);
    Ok((
        StatusCode::CREATED,
        Json(ConversionResponse {
            conversion,
            touchpoint_count,
        }),
    ))
}

// ─── Attribution ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub conversion_id: Uuid,
    pub models: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct CalculateResponse {
    pub conversion: Conversion,
    pub results: Vec<AttributionResult>,
}

/// POST /api/v1/attribution/calculate
///
/// Unknown model ids are filtered out silently; an empty surviving set
/// means all five models.
pub async fn calculate_attribution(
    State(state): State<AppState>,
    Json(request): Json<CalculateRequest>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let models: Vec<AttributionModel> = request
        .models
        .map(|ids| {
            ids.iter()
                .filter_map(|id| AttributionModel::parse(id))
                .collect()
        })
        .unwrap_or_default();

    let (conversion, results) = state
        .engine
        .calculate_attribution(request.conversion_id, &models)?;
    metrics::counter!("attribution.calculations").increment(1);
    Ok(Json(CalculateResponse {
        conversion,
        results,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub models: Option<String>,
    pub group_by: Option<String>,
    pub include_details: Option<bool>,
}

/// GET /api/v1/attribution/report
pub async fn attribution_report(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Json<AttributionReport> {
    let models = parse_models(params.models.as_deref());
    let group_by = params
        .group_by
        .as_deref()
        .map(GroupBy::parse_or_default)
        .unwrap_or(GroupBy::Channel);
    let include_details = params.include_details.unwrap_or(false);

    Json(state.aggregator.get_report(
        params.start_date,
        params.end_date,
        &models,
        group_by,
        include_details,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowParams {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// GET /api/v1/attribution/channels
pub async fn channel_comparison(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Json<ChannelComparison> {
    Json(
        state
            .aggregator
            .get_channel_comparison(params.start_date, params.end_date),
    )
}

/// GET /api/v1/attribution/journey/:visitor_id
pub async fn customer_journey(
    State(state): State<AppState>,
    Path(visitor_id): Path<String>,
) -> Json<CustomerJourney> {
    Json(state.aggregator.get_customer_journey(&visitor_id))
}

#[derive(Serialize)]
pub struct ModelCatalogResponse {
    pub models: Vec<ModelInfo>,
}

/// GET /api/v1/attribution/models
pub async fn model_catalog() -> Json<ModelCatalogResponse> {
    Json(ModelCatalogResponse {
        models: MODEL_CATALOG.to_vec(),
    })
}

// ─── Operational ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
