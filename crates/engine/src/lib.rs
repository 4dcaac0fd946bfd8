//! Multi-touch attribution engine: journey store, journey linker, and the
//! per-model credit calculator.

pub mod calculator;
pub mod engine;
pub mod linker;
pub mod store;

pub use engine::AttributionEngine;
pub use store::{AttributionStore, TouchpointQuery};
