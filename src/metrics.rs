//! Session-level ad metrics: counters, derived rates, and dashboard views.

pub mod aggregator;
pub mod dashboard;
pub mod model;

pub use aggregator::{MetricsAggregator, SessionSummary};
pub use dashboard::{
    performance_alerts, AlertKind, AlertThresholds, LatencyDistribution, PerformanceAlert,
};
pub use model::{fill_rate, percentage, AdMetrics};
