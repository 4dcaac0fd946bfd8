//! Reporting over persisted attribution results: per-model dimension
//! reports, channel-by-model comparison, and visitor journey reconstruction.

pub mod channels;
pub mod journey;
pub mod report;

pub use channels::{ChannelComparison, ChannelModelTotals};
pub use journey::{CustomerJourney, JourneySummary};
pub use report::{AttributionReport, ReportingAggregator};
