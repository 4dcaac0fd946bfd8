//! In-memory attribution store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! This provides the same API surface for development and testing.

use std::sync::atomic::{AtomicU64, Ordering};

use attrib_core::error::{AttribResult, AttributionError};
use attrib_core::types::{
    AttributionModel, AttributionResult, Conversion, ConversionTouchpoint, Touchpoint,
    TouchpointInput,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// Filters for paged touchpoint queries. The time range is required;
/// dimension filters are optional exact matches.
#[derive(Debug, Clone)]
pub struct TouchpointQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub channel: Option<String>,
    pub campaign: Option<String>,
    pub source: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

/// Thread-safe store for touchpoints, conversions, link rows, and computed
/// attribution results.
///
/// Touchpoints and conversions are append-only. Attribution results are
/// keyed by `(conversion, model)` and replaced as a whole set on
/// recomputation; the map's per-key locking makes the replace atomic, so
/// concurrent recomputes resolve last-writer-wins with no partial state.
pub struct AttributionStore {
    touchpoints: DashMap<Uuid, Touchpoint>,
    visitor_index: DashMap<String, Vec<Uuid>>,
    conversions: DashMap<Uuid, Conversion>,
    links: DashMap<Uuid, Vec<ConversionTouchpoint>>,
    results: DashMap<(Uuid, AttributionModel), Vec<AttributionResult>>,
    ingest_seq: AtomicU64,
}

impl AttributionStore {
    pub fn new() -> Self {
        Self {
            touchpoints: DashMap::new(),
            visitor_index: DashMap::new(),
            conversions: DashMap::new(),
            links: DashMap::new(),
            results: DashMap::new(),
            ingest_seq: AtomicU64::new(0),
        }
    }

    // ─── Touchpoints ───────────────────────────────────────────────────────

    /// Durably append one touchpoint. Rejects input missing `visitor_id`
    /// or `channel`; the timestamp defaults to ingestion time.
    pub fn record_touchpoint(&self, input: TouchpointInput) -> AttribResult<Touchpoint> {
        if input.visitor_id.trim().is_empty() {
            return Err(AttributionError::InvalidInput(
                "touchpoint requires a visitor_id".to_string(),
            ));
        }
        if input.channel.trim().is_empty() {
            return Err(AttributionError::InvalidInput(
                "touchpoint requires a channel".to_string(),
            ));
        }

        let touchpoint = Touchpoint {
            id: Uuid::new_v4(),
            visitor_id: input.visitor_id,
            timestamp: input.timestamp.unwrap_or_else(Utc::now),
            channel: input.channel,
            source: input.source,
            medium: input.medium,
            campaign: input.campaign,
            content: input.content,
            term: input.term,
            landing_page: input.landing_page,
            referrer: input.referrer,
            device_type: input.device_type,
            country: input.country,
            metadata: input.metadata,
            seq: self.ingest_seq.fetch_add(1, Ordering::Relaxed),
        };

        self.visitor_index
            .entry(touchpoint.visitor_id.clone())
            .or_default()
            .push(touchpoint.id);
        self.touchpoints.insert(touchpoint.id, touchpoint.clone());
        Ok(touchpoint)
    }

    pub fn get_touchpoint(&self, id: &Uuid) -> Option<Touchpoint> {
        self.touchpoints.get(id).map(|r| r.value().clone())
    }

    /// All touchpoints for one visitor, timestamp-ascending, optionally
    /// bounded to an inclusive time range. Equal timestamps are ordered by
    /// ingestion sequence so positions are reproducible.
    pub fn get_touchpoints(
        &self,
        visitor_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Vec<Touchpoint> {
        let ids: Vec<Uuid> = match self.visitor_index.get(visitor_id) {
            Some(ids) => ids.value().clone(),
            None => return Vec::new(),
        };

        let mut touchpoints: Vec<Touchpoint> = ids
            .iter()
            .filter_map(|id| self.touchpoints.get(id).map(|r| r.value().clone()))
            .filter(|tp| start.map_or(true, |s| tp.timestamp >= s))
            .filter(|tp| end.map_or(true, |e| tp.timestamp <= e))
            .collect();

        touchpoints.sort_by(|a, b| (a.timestamp, a.seq).cmp(&(b.timestamp, b.seq)));
        if let Some(limit) = limit {
            touchpoints.truncate(limit);
        }
        touchpoints
    }

    /// Paged query across all visitors. Returns the page plus the total
    /// match count before pagination.
    pub fn query_touchpoints(&self, query: &TouchpointQuery) -> (Vec<Touchpoint>, usize) {
        let mut matches: Vec<Touchpoint> = self
            .touchpoints
            .iter()
            .map(|r| r.value().clone())
            .filter(|tp| tp.timestamp >= query.start && tp.timestamp <= query.end)
            .filter(|tp| query.channel.as_ref().map_or(true, |c| &tp.channel == c))
            .filter(|tp| {
                query
                    .campaign
                    .as_ref()
                    .map_or(true, |c| tp.campaign.as_deref() == Some(c.as_str()))
            })
            .filter(|tp| {
                query
                    .source
                    .as_ref()
                    .map_or(true, |s| tp.source.as_deref() == Some(s.as_str()))
            })
            .collect();

        matches.sort_by(|a, b| (a.timestamp, a.seq).cmp(&(b.timestamp, b.seq)));
        let total = matches.len();
        let page: Vec<Touchpoint> = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        (page, total)
    }

    // ─── Conversions & links ───────────────────────────────────────────────

    pub fn insert_conversion(&self, conversion: Conversion) {
        self.conversions.insert(conversion.id, conversion);
    }

    pub fn get_conversion(&self, id: &Uuid) -> Option<Conversion> {
        self.conversions.get(id).map(|r| r.value().clone())
    }

    /// All conversions for one visitor, timestamp-ascending.
    pub fn conversions_for_visitor(&self, visitor_id: &str) -> Vec<Conversion> {
        let mut conversions: Vec<Conversion> = self
            .conversions
            .iter()
            .filter(|r| r.value().visitor_id == visitor_id)
            .map(|r| r.value().clone())
            .collect();
        conversions.sort_by_key(|c| c.timestamp);
        conversions
    }

    pub fn insert_links(&self, conversion_id: Uuid, links: Vec<ConversionTouchpoint>) {
        self.links.insert(conversion_id, links);
    }

    /// Link rows for one conversion, ascending by position.
    pub fn get_links(&self, conversion_id: &Uuid) -> Vec<ConversionTouchpoint> {
        let mut links = self
            .links
            .get(conversion_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        links.sort_by_key(|l| l.position);
        links
    }

    // ─── Attribution results ───────────────────────────────────────────────

    /// Replace the full result set for one (conversion, model) pair.
    /// The single-key insert is the transactional boundary: readers see
    /// either the old set or the new set, never a mix.
    pub fn replace_results(
        &self,
        conversion_id: Uuid,
        model: AttributionModel,
        rows: Vec<AttributionResult>,
    ) {
        self.results.insert((conversion_id, model), rows);
    }

    /// All result rows with `calculated_at` inside the inclusive window,
    /// restricted to the given models.
    pub fn results_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        models: &[AttributionModel],
    ) -> Vec<AttributionResult> {
        self.results
            .iter()
            .filter(|r| models.contains(&r.key().1))
            .flat_map(|r| r.value().clone())
            .filter(|row| row.calculated_at >= start && row.calculated_at <= end)
            .collect()
    }

    /// All result rows ever computed for one conversion, across models.
    pub fn results_for_conversion(&self, conversion_id: &Uuid) -> Vec<AttributionResult> {
        let mut rows: Vec<AttributionResult> = AttributionModel::ALL
            .iter()
            .filter_map(|model| self.results.get(&(*conversion_id, *model)))
            .flat_map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| (r.model.as_str(), r.position));
        rows
    }
}

impl Default for AttributionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input(visitor: &str, channel: &str, at: DateTime<Utc>) -> TouchpointInput {
        TouchpointInput {
            visitor_id: visitor.to_string(),
            channel: channel.to_string(),
            timestamp: Some(at),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_missing_required_fields() {
        let store = AttributionStore::new();

        let err = store
            .record_touchpoint(TouchpointInput {
                channel: "email".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");

        let err = store
            .record_touchpoint(TouchpointInput {
                visitor_id: "v1".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_visitor_sequence_is_timestamp_ascending() {
        let store = AttributionStore::new();
        let now = Utc::now();

        // Insert out of order.
        store.record_touchpoint(input("v1", "email", now)).unwrap();
        store
            .record_touchpoint(input("v1", "organic_search", now - Duration::days(5)))
            .unwrap();
        store
            .record_touchpoint(input("v1", "paid_social", now - Duration::days(1)))
            .unwrap();

        let seq = store.get_touchpoints("v1", None, None, None);
        let channels: Vec<&str> = seq.iter().map(|tp| tp.channel.as_str()).collect();
        assert_eq!(channels, vec!["organic_search", "paid_social", "email"]);
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_ingestion_order() {
        let store = AttributionStore::new();
        let at = Utc::now();

        let first = store.record_touchpoint(input("v1", "a", at)).unwrap();
        let second = store.record_touchpoint(input("v1", "b", at)).unwrap();
        let third = store.record_touchpoint(input("v1", "c", at)).unwrap();

        let seq = store.get_touchpoints("v1", None, None, None);
        let ids: Vec<Uuid> = seq.iter().map(|tp| tp.id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let store = AttributionStore::new();
        let now = Utc::now();
        store.record_touchpoint(input("v1", "email", now)).unwrap();

        let hits = store.get_touchpoints("v1", Some(now), Some(now), None);
        assert_eq!(hits.len(), 1);

        let misses = store.get_touchpoints(
            "v1",
            Some(now + Duration::seconds(1)),
            None,
            None,
        );
        assert!(misses.is_empty());
    }

    #[test]
    fn test_query_pagination_and_total() {
        let store = AttributionStore::new();
        let now = Utc::now();
        for i in 0..10 {
            store
                .record_touchpoint(input(
                    &format!("v{}", i),
                    "paid_social",
                    now - Duration::minutes(i),
                ))
                .unwrap();
        }
        store
            .record_touchpoint(input("v-other", "email", now))
            .unwrap();

        let (page, total) = store.query_touchpoints(&TouchpointQuery {
            start: now - Duration::hours(1),
            end: now,
            channel: Some("paid_social".to_string()),
            campaign: None,
            source: None,
            limit: 4,
            offset: 4,
        });
        assert_eq!(total, 10);
        assert_eq!(page.len(), 4);
        // Ascending: offset 4 skips the four oldest.
        assert!(page[0].timestamp < page[3].timestamp);
    }

    #[test]
    fn test_replace_results_is_full_replace() {
        let store = AttributionStore::new();
        let cid = Uuid::new_v4();
        let row = |pct: f64| AttributionResult {
            conversion_id: cid,
            model: AttributionModel::Linear,
            touchpoint_id: Uuid::new_v4(),
            channel: "email".to_string(),
            source: None,
            medium: None,
            campaign: None,
            position: 1,
            total_touchpoints: 1,
            attributed_value: pct,
            attributed_pct: pct,
            calculated_at: Utc::now(),
        };

        store.replace_results(cid, AttributionModel::Linear, vec![row(50.0), row(50.0)]);
        store.replace_results(cid, AttributionModel::Linear, vec![row(100.0)]);

        let rows = store.results_for_conversion(&cid);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attributed_pct, 100.0);
    }
}
