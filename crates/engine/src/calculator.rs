//! Pure credit math for the five attribution models.
//!
//! `credit_shares` maps an ordered touchpoint timestamp sequence to a vector
//! of fractions summing to 1.0. It is deterministic: identical inputs always
//! produce identical outputs, which is what makes recomputation idempotent.

use attrib_core::types::AttributionModel;
use chrono::{DateTime, Utc};

/// Half-life for the time-decay model, anchored to the last touchpoint.
pub const DECAY_HALF_LIFE_DAYS: f64 = 7.0;

/// U-shaped model: share given to each of the first and last touchpoints
/// when the journey has three or more.
pub const POSITION_EDGE_SHARE: f64 = 0.4;

/// U-shaped model: share split equally across the middle touchpoints.
pub const POSITION_MIDDLE_SHARE: f64 = 0.2;

const SECS_PER_DAY: f64 = 86_400.0;

/// Fractional credit per touchpoint for one model, in sequence order.
/// An empty sequence yields an empty vector; callers must not fabricate
/// synthetic credit for unattributed conversions.
pub fn credit_shares(model: AttributionModel, timestamps: &[DateTime<Utc>]) -> Vec<f64> {
    let n = timestamps.len();
    if n == 0 {
        return Vec::new();
    }

    match model {
        AttributionModel::FirstTouch => one_hot(n, 0),
        AttributionModel::LastTouch => one_hot(n, n - 1),
        AttributionModel::Linear => vec![1.0 / n as f64; n],
        AttributionModel::TimeDecay => time_decay_shares(timestamps),
        AttributionModel::PositionBased => position_based_shares(n),
    }
}

fn one_hot(n: usize, index: usize) -> Vec<f64> {
    let mut shares = vec![0.0; n];
    shares[index] = 1.0;
    shares
}

/// Weight `0.5 ^ (days_before_last / half_life)`, normalized. The last
/// touchpoint has weight 1 before normalization, so it always carries the
/// largest share; equal timestamps degenerate to a linear split.
fn time_decay_shares(timestamps: &[DateTime<Utc>]) -> Vec<f64> {
    let anchor = timestamps[timestamps.len() - 1];
    let weights: Vec<f64> = timestamps
        .iter()
        .map(|ts| {
            let days = (anchor - *ts).num_seconds() as f64 / SECS_PER_DAY;
            0.5_f64.powf(days / DECAY_HALF_LIFE_DAYS)
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// U-shaped split: n=1 collapses to first-touch, n=2 to a 50/50 split,
/// n>=3 gives 40% to each edge and splits 20% across the middle.
fn position_based_shares(n: usize) -> Vec<f64> {
    match n {
        1 => vec![1.0],
        2 => vec![0.5, 0.5],
        _ => {
            let middle = POSITION_MIDDLE_SHARE / (n - 2) as f64;
            (0..n)
                .map(|i| {
                    if i == 0 || i == n - 1 {
                        POSITION_EDGE_SHARE
                    } else {
                        middle
                    }
                })
                .collect()
        }
    }
}
