//! Contract C: reconstruct one visitor's full journey. Read-only; never
//! triggers attribution computation.

use attrib_core::types::{AttributionResult, Conversion, Touchpoint};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::report::ReportingAggregator;

/// One touchpoint as linked to a specific conversion.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedTouchpoint {
    pub position: u32,
    pub touchpoint: Touchpoint,
}

/// A conversion with its link snapshot and any credit rows computed so far.
#[derive(Debug, Clone, Serialize)]
pub struct JourneyConversion {
    pub conversion: Conversion,
    pub touchpoints: Vec<LinkedTouchpoint>,
    pub results: Vec<AttributionResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JourneySummary {
    pub touchpoint_count: u64,
    pub conversion_count: u64,
    pub total_value: f64,
    pub first_touch_at: Option<DateTime<Utc>>,
    pub last_touch_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerJourney {
    pub visitor_id: String,
    pub touchpoints: Vec<Touchpoint>,
    pub conversions: Vec<JourneyConversion>,
    pub summary: JourneySummary,
}

impl ReportingAggregator {
    /// All touchpoints and conversions for one visitor. An unknown visitor
    /// yields an empty journey, not an error.
    pub fn get_customer_journey(&self, visitor_id: &str) -> CustomerJourney {
        let store = self.store();
        let touchpoints = store.get_touchpoints(visitor_id, None, None, None);

        let conversions: Vec<JourneyConversion> = store
            .conversions_for_visitor(visitor_id)
            .into_iter()
            .map(|conversion| {
                let linked = store
                    .get_links(&conversion.id)
                    .into_iter()
                    .filter_map(|link| {
                        store
                            .get_touchpoint(&link.touchpoint_id)
                            .map(|touchpoint| LinkedTouchpoint {
                                position: link.position,
                                touchpoint,
                            })
                    })
                    .collect();
                let results = store.results_for_conversion(&conversion.id);
                JourneyConversion {
                    conversion,
                    touchpoints: linked,
                    results,
                }
            })
            .collect();

        let summary = JourneySummary {
            touchpoint_count: touchpoints.len() as u64,
            conversion_count: conversions.len() as u64,
            total_value: conversions.iter().map(|c| c.conversion.value).sum(),
            first_touch_at: touchpoints.first().map(|tp| tp.timestamp),
            last_touch_at: touchpoints.last().map(|tp| tp.timestamp),
        };

        CustomerJourney {
            visitor_id: visitor_id.to_string(),
            touchpoints,
            conversions,
            summary,
        }
    }
}
