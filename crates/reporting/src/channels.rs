//! Contract B: channel-by-model comparison. One row per channel seen in
//! the window, with the total attributed value under each of the five
//! models, so a single table shows how credit shifts per channel with the
//! model choice.

use std::collections::BTreeMap;

use attrib_core::types::AttributionModel;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::report::ReportingAggregator;

#[derive(Debug, Clone, Serialize)]
pub struct ChannelModelTotals {
    pub channel: String,
    /// model id -> total attributed value for this channel.
    pub totals: BTreeMap<&'static str, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelComparison {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub channels: Vec<ChannelModelTotals>,
}

impl ReportingAggregator {
    /// Compare credit per channel across all five models for the window.
    pub fn get_channel_comparison(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ChannelComparison {
        let rows = self
            .store()
            .results_in_window(start, end, &AttributionModel::ALL);

        let mut by_channel: BTreeMap<String, BTreeMap<&'static str, f64>> = BTreeMap::new();
        for row in &rows {
            let totals = by_channel.entry(row.channel.clone()).or_insert_with(|| {
                // Every channel row carries all five models, zero-filled.
                AttributionModel::ALL
                    .iter()
                    .map(|m| (m.as_str(), 0.0))
                    .collect()
            });
            *totals.entry(row.model.as_str()).or_insert(0.0) += row.attributed_value;
        }

        ChannelComparison {
            start,
            end,
            channels: by_channel
                .into_iter()
                .map(|(channel, totals)| ChannelModelTotals { channel, totals })
                .collect(),
        }
    }
}
