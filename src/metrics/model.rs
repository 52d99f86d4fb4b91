//! Session metrics snapshot and the rate formulas derived from it.

use serde::{Deserialize, Serialize};

/// `100 * numerator / denominator`, or 0 when there is nothing to divide by.
pub fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64 * 100.0
}

/// Share of requests that loaded, clamped to `[0, 100]`.
pub fn fill_rate(successes: u64, requests: u64) -> f64 {
    percentage(successes, requests).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdMetrics {
    pub impression_count: u64,
    pub ad_request_count: u64,
    pub ad_load_success_count: u64,
    pub ad_load_failure_count: u64,
    /// Observed load latencies in seconds, in arrival order.
    pub ad_latency_secs: Vec<f64>,
    pub fill_rate: f64,

    pub click_count: u64,
    pub click_through_rate: f64,
    pub rewarded_video_completions: u64,
    pub rewarded_video_completion_rate: f64,
    pub ad_frequency_per_session: u64,
}

impl AdMetrics {
    pub fn average_latency_secs(&self) -> f64 {
        if self.ad_latency_secs.is_empty() {
            return 0.0;
        }
        self.ad_latency_secs.iter().sum::<f64>() / self.ad_latency_secs.len() as f64
    }

    /// Loads that resolved either way.
    pub fn total_load_outcomes(&self) -> u64 {
        self.ad_load_success_count + self.ad_load_failure_count
    }

    pub(crate) fn recompute_fill_rate(&mut self) {
        self.fill_rate = fill_rate(self.ad_load_success_count, self.ad_request_count);
    }

    pub(crate) fn recompute_click_through_rate(&mut self) {
        self.click_through_rate = percentage(self.click_count, self.impression_count);
    }

    pub(crate) fn recompute_completion_rate(&mut self) {
        self.rewarded_video_completion_rate =
            percentage(self.rewarded_video_completions, self.impression_count);
    }
}
