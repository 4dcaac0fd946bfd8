//! Engine facade wiring the journey store, linker, and calculator.

use std::sync::Arc;

use attrib_core::config::AttributionConfig;
use attrib_core::error::{AttribResult, AttributionError};
use attrib_core::types::{
    AttributionModel, AttributionResult, Conversion, ConversionInput, Touchpoint, TouchpointInput,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::calculator;
use crate::linker;
use crate::store::AttributionStore;

/// Request-driven attribution engine. All operations are independently
/// invokable and safe to run concurrently; the store is the only shared
/// state.
#[derive(Clone)]
pub struct AttributionEngine {
    store: Arc<AttributionStore>,
    default_lookback_days: u32,
}

impl std::fmt::Debug for AttributionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributionEngine")
            .field("default_lookback_days", &self.default_lookback_days)
            .finish()
    }
}

impl AttributionEngine {
    pub fn new() -> Self {
        Self::with_config(&AttributionConfig::default())
    }

    pub fn with_config(config: &AttributionConfig) -> Self {
        Self {
            store: Arc::new(AttributionStore::new()),
            default_lookback_days: config.default_lookback_days,
        }
    }

    /// The backing store, shared with the reporting aggregator.
    pub fn store(&self) -> Arc<AttributionStore> {
        self.store.clone()
    }

    /// Append one touchpoint to the visitor's journey.
    pub fn record_touchpoint(&self, input: TouchpointInput) -> AttribResult<Touchpoint> {
        let touchpoint = self.store.record_touchpoint(input)?;
        info!(
            touchpoint_id = %touchpoint.id,
            visitor_id = %touchpoint.visitor_id,
            channel = %touchpoint.channel,
            "Recorded touchpoint"
        );
        Ok(touchpoint)
    }

    /// Record a conversion and snapshot its lookback window. Returns the
    /// conversion and the number of touchpoints linked to it.
    pub fn record_conversion(&self, input: ConversionInput) -> AttribResult<(Conversion, usize)> {
        let (conversion, links) =
            linker::record_conversion(&self.store, input, self.default_lookback_days)?;
        info!(
            conversion_id = %conversion.id,
            visitor_id = %conversion.visitor_id,
            value = conversion.value,
            touchpoint_count = links.len(),
            "Recorded conversion"
        );
        Ok((conversion, links.len()))
    }

    /// Compute and persist credit rows for the requested models. The row
    /// set for each (conversion, model) pair is fully replaced. An empty or
    /// all-unknown model list falls back to all five models; a conversion
    /// with no linked touchpoints yields an empty result list.
    pub fn calculate_attribution(
        &self,
        conversion_id: Uuid,
        models: &[AttributionModel],
    ) -> AttribResult<(Conversion, Vec<AttributionResult>)> {
        let conversion = self.store.get_conversion(&conversion_id).ok_or_else(|| {
            AttributionError::NotFound(format!("conversion {} not found", conversion_id))
        })?;

        let links = self.store.get_links(&conversion_id);
        let journey: Vec<(u32, Touchpoint)> = links
            .iter()
            .map(|link| {
                self.store
                    .get_touchpoint(&link.touchpoint_id)
                    .map(|tp| (link.position, tp))
                    .ok_or_else(|| {
                        AttributionError::Store(format!(
                            "link for conversion {} references missing touchpoint {}",
                            conversion_id, link.touchpoint_id
                        ))
                    })
            })
            .collect::<AttribResult<_>>()?;

        if journey.is_empty() {
            info!(conversion_id = %conversion_id, "No linked touchpoints; nothing to attribute");
            return Ok((conversion, Vec::new()));
        }

        let mut selected: Vec<AttributionModel> = Vec::new();
        for model in models {
            if !selected.contains(model) {
                selected.push(*model);
            }
        }
        if selected.is_empty() {
            selected = AttributionModel::ALL.to_vec();
        }

        let timestamps: Vec<_> = journey.iter().map(|(_, tp)| tp.timestamp).collect();
        let total_touchpoints = journey.len() as u32;
        // One timestamp per batch so a recomputation never straddles a
        // report window boundary.
        let calculated_at = Utc::now();

        let mut results = Vec::with_capacity(journey.len() * selected.len());
        for model in &selected {
            let shares = calculator::credit_shares(*model, &timestamps);
            let rows: Vec<AttributionResult> = journey
                .iter()
                .zip(shares.iter())
                .map(|((position, touchpoint), share)| AttributionResult {
                    conversion_id,
                    model: *model,
                    touchpoint_id: touchpoint.id,
                    channel: touchpoint.channel.clone(),
                    source: touchpoint.source.clone(),
                    medium: touchpoint.medium.clone(),
                    campaign: touchpoint.campaign.clone(),
                    position: *position,
                    total_touchpoints,
                    attributed_value: conversion.value * share,
                    attributed_pct: share * 100.0,
                    calculated_at,
                })
                .collect();
            self.store
                .replace_results(conversion_id, *model, rows.clone());
            results.extend(rows);
        }

        info!(
            conversion_id = %conversion_id,
            models = selected.len(),
            rows = results.len(),
            "Calculated attribution"
        );
        Ok((conversion, results))
    }
}

impl Default for AttributionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    const TOLERANCE: f64 = 1e-6;

    fn touch(engine: &AttributionEngine, channel: &str, at: DateTime<Utc>) {
        engine
            .record_touchpoint(TouchpointInput {
                visitor_id: "v1".to_string(),
                channel: channel.to_string(),
                timestamp: Some(at),
                ..Default::default()
            })
            .unwrap();
    }

    fn convert(engine: &AttributionEngine, value: f64, at: DateTime<Utc>) -> Conversion {
        let (conversion, _) = engine
            .record_conversion(ConversionInput {
                visitor_id: "v1".to_string(),
                conversion_type: "purchase".to_string(),
                value: Some(value),
                timestamp: Some(at),
                ..Default::default()
            })
            .unwrap();
        conversion
    }

    /// Per-channel attributed value for one model.
    fn value_for(results: &[AttributionResult], model: AttributionModel, channel: &str) -> f64 {
        results
            .iter()
            .filter(|r| r.model == model && r.channel == channel)
            .map(|r| r.attributed_value)
            .sum()
    }

    #[test]
    fn test_unknown_conversion_is_not_found() {
        let engine = AttributionEngine::new();
        let err = engine
            .calculate_attribution(Uuid::new_v4(), &[])
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_unattributed_conversion_yields_empty_results() {
        let engine = AttributionEngine::new();
        let conversion = convert(&engine, 50.0, Utc::now());

        let (_, results) = engine.calculate_attribution(conversion.id, &[]).unwrap();
        assert!(results.is_empty());
        assert!(engine.store.results_for_conversion(&conversion.id).is_empty());
    }

    // The canonical three-touch journey: organic_search at day 0, email at
    // day 5, paid_social at day 9, conversion of 100 at day 10.
    fn canonical_journey() -> (AttributionEngine, Conversion) {
        let engine = AttributionEngine::new();
        let day10 = Utc::now();
        touch(&engine, "organic_search", day10 - Duration::days(10));
        touch(&engine, "email", day10 - Duration::days(5));
        touch(&engine, "paid_social", day10 - Duration::days(1));
        let conversion = convert(&engine, 100.0, day10);
        (engine, conversion)
    }

    #[test]
    fn test_canonical_journey_per_model_values() {
        let (engine, conversion) = canonical_journey();
        let (_, results) = engine.calculate_attribution(conversion.id, &[]).unwrap();

        // 3 touchpoints x 5 models
        assert_eq!(results.len(), 15);

        assert!(
            (value_for(&results, AttributionModel::FirstTouch, "organic_search") - 100.0).abs()
                < TOLERANCE
        );
        assert!(
            (value_for(&results, AttributionModel::LastTouch, "paid_social") - 100.0).abs()
                < TOLERANCE
        );
        assert!(
            (value_for(&results, AttributionModel::Linear, "email") - 100.0 / 3.0).abs()
                < TOLERANCE
        );
        assert!(
            (value_for(&results, AttributionModel::PositionBased, "organic_search") - 40.0).abs()
                < TOLERANCE
        );
        assert!(
            (value_for(&results, AttributionModel::PositionBased, "email") - 20.0).abs()
                < TOLERANCE
        );
        assert!(
            (value_for(&results, AttributionModel::PositionBased, "paid_social") - 40.0).abs()
                < TOLERANCE
        );

        let decay_first = value_for(&results, AttributionModel::TimeDecay, "organic_search");
        let decay_mid = value_for(&results, AttributionModel::TimeDecay, "email");
        let decay_last = value_for(&results, AttributionModel::TimeDecay, "paid_social");
        assert!(decay_last > decay_mid);
        assert!(decay_mid > decay_first);
    }

    #[test]
    fn test_sums_match_conversion_value_and_hundred_pct() {
        let (engine, conversion) = canonical_journey();
        let (_, results) = engine.calculate_attribution(conversion.id, &[]).unwrap();

        for model in AttributionModel::ALL {
            let value: f64 = results
                .iter()
                .filter(|r| r.model == model)
                .map(|r| r.attributed_value)
                .sum();
            let pct: f64 = results
                .iter()
                .filter(|r| r.model == model)
                .map(|r| r.attributed_pct)
                .sum();
            assert!((value - 100.0).abs() < TOLERANCE, "model {:?}", model);
            assert!((pct - 100.0).abs() < TOLERANCE, "model {:?}", model);
        }
    }

    #[test]
    fn test_results_denormalize_touchpoint_dimensions() {
        let engine = AttributionEngine::new();
        let now = Utc::now();
        engine
            .record_touchpoint(TouchpointInput {
                visitor_id: "v1".to_string(),
                channel: "paid_social".to_string(),
                source: Some("instagram".to_string()),
                medium: Some("cpc".to_string()),
                campaign: Some("spring_sale".to_string()),
                timestamp: Some(now - Duration::days(1)),
                ..Default::default()
            })
            .unwrap();
        let conversion = convert(&engine, 10.0, now);

        let (_, results) = engine
            .calculate_attribution(conversion.id, &[AttributionModel::LastTouch])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source.as_deref(), Some("instagram"));
        assert_eq!(results[0].campaign.as_deref(), Some("spring_sale"));
        assert_eq!(results[0].total_touchpoints, 1);
        assert_eq!(results[0].position, 1);
    }

    #[test]
    fn test_recalculation_is_idempotent() {
        let (engine, conversion) = canonical_journey();
        let (_, first) = engine.calculate_attribution(conversion.id, &[]).unwrap();
        let (_, second) = engine.calculate_attribution(conversion.id, &[]).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.model, b.model);
            assert_eq!(a.touchpoint_id, b.touchpoint_id);
            assert_eq!(a.position, b.position);
            assert_eq!(a.attributed_value, b.attributed_value);
            assert_eq!(a.attributed_pct, b.attributed_pct);
        }

        // Recomputation replaced, not appended.
        let persisted = engine.store.results_for_conversion(&conversion.id);
        assert_eq!(persisted.len(), 15);
    }

    #[test]
    fn test_duplicate_model_ids_computed_once() {
        let (engine, conversion) = canonical_journey();
        let (_, results) = engine
            .calculate_attribution(
                conversion.id,
                &[AttributionModel::Linear, AttributionModel::Linear],
            )
            .unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_batch_shares_one_calculated_at() {
        let (engine, conversion) = canonical_journey();
        let (_, results) = engine.calculate_attribution(conversion.id, &[]).unwrap();
        let first = results[0].calculated_at;
        assert!(results.iter().all(|r| r.calculated_at == first));
    }
}
