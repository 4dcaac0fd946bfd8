//! Contract A: group persisted credit rows by a caller-chosen dimension,
//! per model, over a `calculated_at` window.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use attrib_core::types::{AttributionModel, AttributionResult, GroupBy};
use attrib_engine::AttributionStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Dimension value used when a touchpoint did not carry the grouped field.
const UNKNOWN_DIMENSION: &str = "unknown";

/// Aggregate for one dimension value under one model.
#[derive(Debug, Clone, Serialize)]
pub struct DimensionStat {
    pub attributed_value: f64,
    /// Distinct conversions contributing to this group.
    pub conversions: u64,
    /// Share of the model's total attributed value, 0..=100.
    pub pct_of_model_total: f64,
    /// Underlying rows, present only when details were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<AttributionResult>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelBreakdown {
    pub model: AttributionModel,
    pub total_value: f64,
    pub groups: BTreeMap<String, DimensionStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// Distinct conversions across every requested model.
    pub total_conversions: u64,
    /// Headline number: total attributed value under the first requested model.
    pub total_value: f64,
    pub headline_model: AttributionModel,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributionReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub group_by: GroupBy,
    pub models: Vec<ModelBreakdown>,
    pub summary: ReportSummary,
}

/// Read-side aggregator over the attribution store. Carries no state of its
/// own; every report is computed from persisted rows at call time.
#[derive(Clone)]
pub struct ReportingAggregator {
    store: Arc<AttributionStore>,
}

impl ReportingAggregator {
    pub fn new(store: Arc<AttributionStore>) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &AttributionStore {
        &self.store
    }

    /// Build the per-model dimension report. Zero matching rows is a valid
    /// answer and yields a well-formed report with empty groups.
    pub fn get_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        models: &[AttributionModel],
        group_by: GroupBy,
        include_details: bool,
    ) -> AttributionReport {
        let mut selected: Vec<AttributionModel> = Vec::new();
        for model in models {
            if !selected.contains(model) {
                selected.push(*model);
            }
        }
        if selected.is_empty() {
            selected = AttributionModel::ALL.to_vec();
        }

        let rows = self.store.results_in_window(start, end, &selected);
        debug!(rows = rows.len(), ?group_by, "Building attribution report");

        let mut breakdowns = Vec::with_capacity(selected.len());
        let mut all_conversions: HashSet<Uuid> = HashSet::new();

        for model in &selected {
            let model_rows: Vec<&AttributionResult> =
                rows.iter().filter(|r| r.model == *model).collect();
            let model_total: f64 = model_rows.iter().map(|r| r.attributed_value).sum();

            let mut groups: BTreeMap<String, DimensionStat> = BTreeMap::new();
            let mut group_conversions: BTreeMap<String, HashSet<Uuid>> = BTreeMap::new();

            for &row in &model_rows {
                all_conversions.insert(row.conversion_id);
                let key = dimension_value(row, group_by);
                let stat = groups.entry(key.clone()).or_insert_with(|| DimensionStat {
                    attributed_value: 0.0,
                    conversions: 0,
                    pct_of_model_total: 0.0,
                    details: include_details.then(Vec::new),
                });
                stat.attributed_value += row.attributed_value;
                if let Some(details) = &mut stat.details {
                    details.push(row.clone());
                }
                group_conversions
                    .entry(key)
                    .or_default()
                    .insert(row.conversion_id);
            }

            for (key, stat) in &mut groups {
                stat.conversions = group_conversions
                    .get(key)
                    .map(|set| set.len() as u64)
                    .unwrap_or(0);
                stat.pct_of_model_total = if model_total > 0.0 {
                    stat.attributed_value / model_total * 100.0
                } else {
                    0.0
                };
            }

            breakdowns.push(ModelBreakdown {
                model: *model,
                total_value: model_total,
                groups,
            });
        }

        let summary = ReportSummary {
            total_conversions: all_conversions.len() as u64,
            total_value: breakdowns.first().map(|b| b.total_value).unwrap_or(0.0),
            headline_model: selected[0],
        };

        AttributionReport {
            start,
            end,
            group_by,
            models: breakdowns,
            summary,
        }
    }
}

/// The grouped dimension value for one result row.
pub(crate) fn dimension_value(row: &AttributionResult, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Channel => row.channel.clone(),
        GroupBy::Source => row
            .source
            .clone()
            .unwrap_or_else(|| UNKNOWN_DIMENSION.to_string()),
        GroupBy::Campaign => row
            .campaign
            .clone()
            .unwrap_or_else(|| UNKNOWN_DIMENSION.to_string()),
        GroupBy::Medium => row
            .medium
            .clone()
            .unwrap_or_else(|| UNKNOWN_DIMENSION.to_string()),
    }
}
