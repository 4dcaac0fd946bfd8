//! Domain types shared across the attribution engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Attribution models ─────────────────────────────────────────────────────

/// The closed set of crediting models. The set is fixed; dispatch over it is
/// exhaustive so a new model cannot be added without touching the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionModel {
    FirstTouch,
    LastTouch,
    Linear,
    TimeDecay,
    PositionBased,
}

impl AttributionModel {
    pub const ALL: [AttributionModel; 5] = [
        AttributionModel::FirstTouch,
        AttributionModel::LastTouch,
        AttributionModel::Linear,
        AttributionModel::TimeDecay,
        AttributionModel::PositionBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionModel::FirstTouch => "first_touch",
            AttributionModel::LastTouch => "last_touch",
            AttributionModel::Linear => "linear",
            AttributionModel::TimeDecay => "time_decay",
            AttributionModel::PositionBased => "position_based",
        }
    }

    /// Parse a model id; unknown ids return `None` so callers can filter
    /// them out silently.
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "first_touch" => Some(AttributionModel::FirstTouch),
            "last_touch" => Some(AttributionModel::LastTouch),
            "linear" => Some(AttributionModel::Linear),
            "time_decay" => Some(AttributionModel::TimeDecay),
            "position_based" => Some(AttributionModel::PositionBased),
            _ => None,
        }
    }
}

/// Static catalog entry for UI population.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Human-readable catalog of the five models. Pure static data.
pub const MODEL_CATALOG: [ModelInfo; 5] = [
    ModelInfo {
        id: "first_touch",
        name: "First Touch",
        description: "100% of the credit goes to the first touchpoint in the journey.",
    },
    ModelInfo {
        id: "last_touch",
        name: "Last Touch",
        description: "100% of the credit goes to the last touchpoint before the conversion.",
    },
    ModelInfo {
        id: "linear",
        name: "Linear",
        description: "Credit is split equally across every touchpoint in the journey.",
    },
    ModelInfo {
        id: "time_decay",
        name: "Time Decay",
        description: "Credit decays exponentially with distance from the conversion (7-day half-life).",
    },
    ModelInfo {
        id: "position_based",
        name: "Position Based (U-Shaped)",
        description: "40% to the first and last touchpoints, 20% split across the middle.",
    },
];

// ─── Reporting dimensions ───────────────────────────────────────────────────

/// Dimension a report can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Channel,
    Source,
    Campaign,
    Medium,
}

impl GroupBy {
    /// Parse a dimension name; anything unrecognized falls back to channel.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "source" => GroupBy::Source,
            "campaign" => GroupBy::Campaign,
            "medium" => GroupBy::Medium,
            _ => GroupBy::Channel,
        }
    }
}

// ─── Touchpoints ────────────────────────────────────────────────────────────

/// One recorded marketing exposure for a visitor. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Touchpoint {
    pub id: Uuid,
    pub visitor_id: String,
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub content: Option<String>,
    pub term: Option<String>,
    pub landing_page: Option<String>,
    pub referrer: Option<String>,
    pub device_type: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Ingestion sequence number, used to break timestamp ties
    /// deterministically. Not part of the wire format.
    #[serde(skip)]
    pub seq: u64,
}

/// Caller-supplied fields for recording a touchpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TouchpointInput {
    #[serde(default)]
    pub visitor_id: String,
    #[serde(default)]
    pub channel: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub content: Option<String>,
    pub term: Option<String>,
    pub landing_page: Option<String>,
    pub referrer: Option<String>,
    pub device_type: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

// ─── Conversions ────────────────────────────────────────────────────────────

/// A value-bearing terminal event for a visitor. The lookback window is
/// fixed at creation and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversion {
    pub id: Uuid,
    pub visitor_id: String,
    pub conversion_type: String,
    pub value: f64,
    pub currency: String,
    pub order_id: Option<String>,
    pub product_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub lookback_days: u32,
}

/// Caller-supplied fields for recording a conversion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversionInput {
    #[serde(default)]
    pub visitor_id: String,
    #[serde(default)]
    pub conversion_type: String,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub order_id: Option<String>,
    pub product_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub timestamp: Option<DateTime<Utc>>,
    pub lookback_days: Option<u32>,
}

/// Link row produced by the journey linker: a snapshot of one touchpoint's
/// position within a conversion's lookback window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionTouchpoint {
    pub conversion_id: Uuid,
    pub touchpoint_id: Uuid,
    /// 1-based, ascending by touchpoint timestamp.
    pub position: u32,
}

// ─── Attribution results ────────────────────────────────────────────────────

/// One row of computed credit: (conversion, model, touchpoint).
///
/// Channel/source/medium/campaign are denormalized from the linked
/// touchpoint so reports never join back to the journey store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionResult {
    pub conversion_id: Uuid,
    pub model: AttributionModel,
    pub touchpoint_id: Uuid,
    pub channel: String,
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub position: u32,
    pub total_touchpoints: u32,
    /// In the conversion's currency. Sums to the conversion value across
    /// a (conversion, model) set.
    pub attributed_value: f64,
    /// 0..=100; sums to 100 across a (conversion, model) set.
    pub attributed_pct: f64,
    pub calculated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parse_round_trip() {
        for model in AttributionModel::ALL {
            assert_eq!(AttributionModel::parse(model.as_str()), Some(model));
        }
        assert_eq!(AttributionModel::parse("markov_chain"), None);
    }

    #[test]
    fn test_catalog_matches_model_set() {
        assert_eq!(MODEL_CATALOG.len(), AttributionModel::ALL.len());
        for info in &MODEL_CATALOG {
            assert!(AttributionModel::parse(info.id).is_some());
        }
    }

    #[test]
    fn test_group_by_fallback() {
        assert_eq!(GroupBy::parse_or_default("campaign"), GroupBy::Campaign);
        assert_eq!(GroupBy::parse_or_default("device"), GroupBy::Channel);
        assert_eq!(GroupBy::parse_or_default(""), GroupBy::Channel);
    }

    #[test]
    fn test_model_serde_uses_snake_case() {
        let json = serde_json::to_string(&AttributionModel::TimeDecay).unwrap();
        assert_eq!(json, "\"time_decay\"");
    }
}
