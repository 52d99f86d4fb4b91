//! Session metrics aggregator.
//!
//! Counters move on every tracked event; rates are recomputed from the
//! counters each time so they never drift.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::TrackingConfig;
use crate::lifecycle::probe::{battery_delta, ImpactProbe, NoopProbe};
use crate::metrics::dashboard::{performance_alerts, AlertThresholds, PerformanceAlert};
use crate::metrics::model::AdMetrics;
use crate::telemetry::events::{AdType, CapturedEvent, Severity};
use crate::telemetry::sinks::TelemetrySink;
use crate::telemetry::new_request_id;

pub const FREQUENCY_WARNING_MESSAGE: &str = "Excessive Ad Frequency Detected";
pub const SESSION_SUMMARY_MESSAGE: &str = "Ad Session Summary";
pub const METRICS_EXPORT_MESSAGE: &str = "Ad Performance Metrics Export";
pub const PERFORMANCE_IMPACT_PREFIX: &str = "App Performance Impact";

/// Final figures for one session, returned by `end_session` and captured as an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub click_through_rate: f64,
    pub fill_rate: f64,
    pub average_latency_secs: f64,
    pub rewarded_video_completion_rate: f64,
    /// Requests still waiting for a load outcome when the session ended.
    pub abandoned_requests: usize,
}

pub struct MetricsAggregator {
    metrics: AdMetrics,
    session_started: Instant,
    session_started_at: DateTime<Utc>,
    request_started: HashMap<String, Instant>,
    thresholds: AlertThresholds,
    probe: Arc<dyn ImpactProbe>,
    battery_at_session_start: Option<f64>,
    sink: Arc<dyn TelemetrySink>,
}

impl MetricsAggregator {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            metrics: AdMetrics::default(),
            session_started: Instant::now(),
            session_started_at: Utc::now(),
            request_started: HashMap::new(),
            thresholds: AlertThresholds::default(),
            probe: Arc::new(NoopProbe),
            battery_at_session_start: None,
            sink,
        }
    }

    pub fn with_config(sink: Arc<dyn TelemetrySink>, config: &TrackingConfig) -> Self {
        let mut aggregator = Self::new(sink);
        aggregator.thresholds = config.alerts;
        aggregator
    }

    pub fn with_probe(mut self, probe: Arc<dyn ImpactProbe>) -> Self {
        self.battery_at_session_start = probe.battery_level_percent();
        self.probe = probe;
        self
    }

    pub fn metrics(&self) -> &AdMetrics {
        &self.metrics
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    pub fn session_started_at(&self) -> DateTime<Utc> {
        self.session_started_at
    }

    /// Requests without a load outcome yet. Survives `start_session`;
    /// `end_session` drops whatever is left.
    pub fn pending_requests(&self) -> usize {
        self.request_started.len()
    }

    pub fn alerts(&self) -> Vec<PerformanceAlert> {
        performance_alerts(&self.metrics, &self.thresholds)
    }

    /// Zero every counter and restart the session clock. Requests still in
    /// flight keep their start times so their latency is still measured.
    pub fn start_session(&mut self) {
        self.metrics = AdMetrics::default();
        self.session_started = Instant::now();
        self.session_started_at = Utc::now();
        self.battery_at_session_start = self.probe.battery_level_percent();
        self.sink.capture(
            CapturedEvent::new("Ad Session Started", Severity::Info)
                .tag("session_start", self.session_started_at.to_rfc3339()),
        );
        info!(session_start = %self.session_started_at, "ad session started");
    }

    /// Report the session. Counters are left as they are until the next
    /// `start_session`; requests that never resolved are dropped.
    pub fn end_session(&mut self) -> SessionSummary {
        let duration_secs = self.session_started.elapsed().as_secs_f64();
        let abandoned_requests = self.request_started.len();
        self.request_started.clear();
        let summary = SessionSummary {
            started_at: self.session_started_at,
            duration_secs,
            total_impressions: self.metrics.impression_count,
            total_clicks: self.metrics.click_count,
            click_through_rate: self.metrics.click_through_rate,
            fill_rate: self.metrics.fill_rate,
            average_latency_secs: self.metrics.average_latency_secs(),
            rewarded_video_completion_rate: self.metrics.rewarded_video_completion_rate,
            abandoned_requests,
        };

        self.sink.capture(
            CapturedEvent::new(SESSION_SUMMARY_MESSAGE, Severity::Info)
                .tag_pct("session_duration_seconds", summary.duration_secs)
                .tag("total_impressions", summary.total_impressions)
                .tag("total_clicks", summary.total_clicks)
                .tag_pct("final_ctr_percentage", summary.click_through_rate)
                .tag_pct("final_fill_rate_percentage", summary.fill_rate)
                .tag_pct("average_latency_seconds", summary.average_latency_secs)
                .tag("abandoned_requests", summary.abandoned_requests),
        );
        info!(
            duration_secs = summary.duration_secs,
            impressions = summary.total_impressions,
            abandoned_requests,
            "ad session ended"
        );
        summary
    }

    /// Count a request and return the id to pass to the matching load outcome.
    pub fn track_ad_request(&mut self, ad_type: AdType, ad_unit_id: &str) -> String {
        let request_id = new_request_id();
        self.request_started.insert(request_id.clone(), Instant::now());
        self.metrics.ad_request_count += 1;
        self.metrics.recompute_fill_rate();

        self.sink.capture(
            CapturedEvent::new(format!("Ad Request - {}", ad_type.display_name()), Severity::Info)
                .tag("ad_type", ad_type)
                .tag("ad_unit_id", ad_unit_id)
                .tag("request_id", &request_id),
        );
        debug!(
            ad_type = ad_type.as_str(),
            ad_unit_id = %ad_unit_id,
            request_id = %request_id,
            "ad request tracked"
        );
        self.track_performance_impact(ad_type, "request");
        request_id
    }

    /// Time since the request started; zero when the request is unknown.
    fn take_latency(&mut self, request_id: Option<&str>) -> Duration {
        request_id
            .and_then(|id| self.request_started.remove(id))
            .map(|started| started.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub fn track_ad_load_success(
        &mut self,
        ad_type: AdType,
        ad_unit_id: &str,
        request_id: Option<&str>,
    ) -> Duration {
        let latency = self.take_latency(request_id);
        self.metrics.ad_load_success_count += 1;
        self.metrics.ad_latency_secs.push(latency.as_secs_f64());
        self.metrics.recompute_fill_rate();

        self.sink.capture(
            CapturedEvent::new(
                format!("Ad Load Success - {}", ad_type.display_name()),
                Severity::Info,
            )
            .tag("ad_type", ad_type)
            .tag("ad_unit_id", ad_unit_id)
            .tag_pct("load_time_seconds", latency.as_secs_f64()),
        );
        debug!(
            ad_type = ad_type.as_str(),
            load_time_secs = latency.as_secs_f64(),
            fill_rate = self.metrics.fill_rate,
            "ad load success"
        );
        latency
    }

    pub fn track_ad_load_failure(
        &mut self,
        ad_type: AdType,
        ad_unit_id: &str,
        error: &str,
        request_id: Option<&str>,
    ) -> Duration {
        let latency = self.take_latency(request_id);
        self.metrics.ad_load_failure_count += 1;
        self.metrics.ad_latency_secs.push(latency.as_secs_f64());
        self.metrics.recompute_fill_rate();

        self.sink.capture(
            CapturedEvent::new(error, Severity::Error)
                .tag("ad_type", ad_type)
                .tag("ad_unit_id", ad_unit_id)
                .tag_pct("load_time_seconds", latency.as_secs_f64())
                .tag("error_type", "ad_load_failure"),
        );
        warn!(
            ad_type = ad_type.as_str(),
            ad_unit_id = %ad_unit_id,
            error = %error,
            "ad load failure"
        );
        self.track_performance_impact(ad_type, "load_failure");
        latency
    }

    pub fn track_ad_impression(&mut self, ad_type: AdType, ad_unit_id: &str) {
        self.metrics.impression_count += 1;
        self.metrics.ad_frequency_per_session += 1;
        self.metrics.recompute_click_through_rate();
        self.metrics.recompute_completion_rate();
        self.check_frequency_limit();

        self.sink.capture(
            CapturedEvent::new(
                format!("Ad Impression - {}", ad_type.display_name()),
                Severity::Info,
            )
            .tag("ad_type", ad_type)
            .tag("ad_unit_id", ad_unit_id)
            .tag("total_impressions", self.metrics.impression_count),
        );
        debug!(
            ad_type = ad_type.as_str(),
            total = self.metrics.impression_count,
            "ad impression"
        );
        self.track_performance_impact(ad_type, "impression");
    }

    /// Capture device readings next to a tracked operation. Battery impact is
    /// the drain since the session started.
    fn track_performance_impact(&self, ad_type: AdType, operation: &str) {
        let memory_mb = self.probe.memory_usage_mb();
        let battery_impact = battery_delta(
            self.battery_at_session_start,
            self.probe.battery_level_percent(),
        );

        let mut event = CapturedEvent::new(
            format!("{} - {}", PERFORMANCE_IMPACT_PREFIX, ad_type.display_name()),
            Severity::Info,
        )
        .tag("ad_type", ad_type)
        .tag("operation", operation);
        if let Some(memory_mb) = memory_mb {
            event = event.tag_pct("memory_usage_mb", memory_mb);
        }
        if let Some(battery_impact) = battery_impact {
            event = event.tag_pct("battery_impact_percent", battery_impact);
        }
        self.sink.capture(event);
        debug!(
            ad_type = ad_type.as_str(),
            operation = %operation,
            memory_mb = memory_mb.unwrap_or_default(),
            battery_impact = battery_impact.unwrap_or_default(),
            "performance impact"
        );
    }

    /// Advisory only. Fires on every impression past the limit, not just the first.
    fn check_frequency_limit(&self) {
        let current = self.metrics.ad_frequency_per_session;
        let max = self.thresholds.max_ad_frequency_per_session;
        if current > max {
            self.sink.capture(
                CapturedEvent::new(FREQUENCY_WARNING_MESSAGE, Severity::Warning)
                    .tag("current_frequency", current)
                    .tag("max_frequency", max),
            );
            warn!(current, max, "excessive ad frequency in session");
        }
    }

    pub fn track_ad_click(&mut self, ad_type: AdType, ad_unit_id: &str) {
        self.metrics.click_count += 1;
        self.metrics.recompute_click_through_rate();
        let ctr = self.metrics.click_through_rate;

        self.sink.capture(
            CapturedEvent::new(format!("Ad Click - {}", ad_type.display_name()), Severity::Info)
                .tag("ad_type", ad_type)
                .tag("ad_unit_id", ad_unit_id)
                .tag_pct("ctr_percentage", ctr),
        );
        debug!(ad_type = ad_type.as_str(), ctr, "ad click");
    }

    pub fn track_rewarded_video_completion(
        &mut self,
        ad_unit_id: &str,
        reward_amount: i64,
        reward_type: &str,
    ) {
        self.metrics.rewarded_video_completions += 1;
        self.metrics.recompute_completion_rate();
        let rate = self.metrics.rewarded_video_completion_rate;

        self.sink.capture(
            CapturedEvent::new("Rewarded Video Completion", Severity::Info)
                .tag("ad_unit_id", ad_unit_id)
                .tag("reward_amount", reward_amount)
                .tag("reward_type", reward_type)
                .tag_pct("completion_rate_percentage", rate),
        );
        debug!(reward_amount, reward_type = %reward_type, rate, "rewarded video completed");
    }

    /// Capture the whole snapshot as one event.
    pub fn export_metrics(&self) {
        let m = &self.metrics;
        self.sink.capture(
            CapturedEvent::new(METRICS_EXPORT_MESSAGE, Severity::Info)
                .tag("total_impressions", m.impression_count)
                .tag("total_clicks", m.click_count)
                .tag_pct("ctr_percentage", m.click_through_rate)
                .tag_pct("fill_rate_percentage", m.fill_rate)
                .tag_pct("avg_latency_seconds", m.average_latency_secs())
                .tag("rewarded_completions", m.rewarded_video_completions)
                .tag_pct("completion_rate_percentage", m.rewarded_video_completion_rate),
        );
        info!("ad metrics exported");
    }
}
