//! Read-only views over `AdMetrics`: alerts and the latency histogram.

use serde::{Deserialize, Serialize};

use crate::metrics::model::AdMetrics;
use crate::telemetry::events::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    #[serde(default = "default_min_fill_rate")]
    pub min_fill_rate: f64,
    #[serde(default = "default_max_average_latency_secs")]
    pub max_average_latency_secs: f64,
    #[serde(default = "default_min_click_through_rate")]
    pub min_click_through_rate: f64,
    #[serde(default = "default_max_frequency")]
    pub max_ad_frequency_per_session: u64,
}

fn default_min_fill_rate() -> f64 {
    80.0
}

fn default_max_average_latency_secs() -> f64 {
    3.0
}

fn default_min_click_through_rate() -> f64 {
    0.5
}

fn default_max_frequency() -> u64 {
    3
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            min_fill_rate: default_min_fill_rate(),
            max_average_latency_secs: default_max_average_latency_secs(),
            min_click_through_rate: default_min_click_through_rate(),
            max_ad_frequency_per_session: default_max_frequency(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowFillRate,
    HighLatency,
    LowClickThroughRate,
    ExcessiveFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub kind: AlertKind,
    pub message: String,
    pub severity: Severity,
}

impl PerformanceAlert {
    fn new(kind: AlertKind, severity: Severity) -> Self {
        let message = match kind {
            AlertKind::LowFillRate => "Low fill rate detected",
            AlertKind::HighLatency => "High ad latency detected",
            AlertKind::LowClickThroughRate => "Low CTR detected",
            AlertKind::ExcessiveFrequency => "Excessive ad frequency",
        };
        Self {
            kind,
            message: message.to_string(),
            severity,
        }
    }
}

/// Alerts for the current snapshot. Rates are only judged once they have a
/// denominator, so an empty session raises nothing.
pub fn performance_alerts(metrics: &AdMetrics, thresholds: &AlertThresholds) -> Vec<PerformanceAlert> {
    let mut alerts = Vec::new();
    if metrics.ad_request_count > 0 && metrics.fill_rate < thresholds.min_fill_rate {
        alerts.push(PerformanceAlert::new(AlertKind::LowFillRate, Severity::Warning));
    }
    if metrics.average_latency_secs() > thresholds.max_average_latency_secs {
        alerts.push(PerformanceAlert::new(AlertKind::HighLatency, Severity::Error));
    }
    if metrics.impression_count > 0
        && metrics.click_through_rate < thresholds.min_click_through_rate
    {
        alerts.push(PerformanceAlert::new(
            AlertKind::LowClickThroughRate,
            Severity::Warning,
        ));
    }
    if metrics.ad_frequency_per_session > thresholds.max_ad_frequency_per_session {
        alerts.push(PerformanceAlert::new(
            AlertKind::ExcessiveFrequency,
            Severity::Error,
        ));
    }
    alerts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyDistribution {
    pub under_1s: usize,
    pub from_1s_to_2s: usize,
    pub from_2s_to_3s: usize,
    pub over_3s: usize,
}

impl LatencyDistribution {
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut dist = Self::default();
        for &secs in samples {
            if secs < 1.0 {
                dist.under_1s += 1;
            } else if secs < 2.0 {
                dist.from_1s_to_2s += 1;
            } else if secs < 3.0 {
                dist.from_2s_to_3s += 1;
            } else {
                dist.over_3s += 1;
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.under_1s + self.from_1s_to_2s + self.from_2s_to_3s + self.over_3s
    }

    /// `(label, count)` rows in display order.
    pub fn buckets(&self) -> [(&'static str, usize); 4] {
        [
            ("< 1s", self.under_1s),
            ("1-2s", self.from_1s_to_2s),
            ("2-3s", self.from_2s_to_3s),
            ("> 3s", self.over_3s),
        ]
    }
}
