//! Journey linker: records a conversion and snapshots the eligible
//! touchpoint window as link rows.
//!
//! The lookback window is fixed at recording time. A conversion with zero
//! eligible touchpoints is still recorded; unattributed conversions are
//! valid and show up in reports with no credit rows.

use attrib_core::error::{AttribResult, AttributionError};
use attrib_core::types::{Conversion, ConversionInput, ConversionTouchpoint};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::store::AttributionStore;

/// Record a conversion and link every touchpoint for its visitor with a
/// timestamp in `[timestamp - lookback_days, timestamp]`, positions assigned
/// 1-based in timestamp order.
pub fn record_conversion(
    store: &AttributionStore,
    input: ConversionInput,
    default_lookback_days: u32,
) -> AttribResult<(Conversion, Vec<ConversionTouchpoint>)> {
    if input.visitor_id.trim().is_empty() {
        return Err(AttributionError::InvalidInput(
            "conversion requires a visitor_id".to_string(),
        ));
    }
    if input.conversion_type.trim().is_empty() {
        return Err(AttributionError::InvalidInput(
            "conversion requires a conversion_type".to_string(),
        ));
    }

    let lookback_days = input.lookback_days.unwrap_or(default_lookback_days);
    let timestamp = input.timestamp.unwrap_or_else(Utc::now);
    let window_start = timestamp - Duration::days(lookback_days as i64);

    let conversion = Conversion {
        id: Uuid::new_v4(),
        visitor_id: input.visitor_id,
        conversion_type: input.conversion_type,
        value: input.value.unwrap_or(0.0),
        currency: input.currency.unwrap_or_else(|| "USD".to_string()),
        order_id: input.order_id,
        product_id: input.product_id,
        metadata: input.metadata,
        timestamp,
        lookback_days,
    };

    let window = store.get_touchpoints(
        &conversion.visitor_id,
        Some(window_start),
        Some(timestamp),
        None,
    );
    let links: Vec<ConversionTouchpoint> = window
        .iter()
        .enumerate()
        .map(|(index, touchpoint)| ConversionTouchpoint {
            conversion_id: conversion.id,
            touchpoint_id: touchpoint.id,
            position: index as u32 + 1,
        })
        .collect();

    store.insert_conversion(conversion.clone());
    store.insert_links(conversion.id, links.clone());

    Ok((conversion, links))
}
