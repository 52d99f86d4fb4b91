//! Integration tests for session metrics aggregation

use adscope::metrics::aggregator::{
    FREQUENCY_WARNING_MESSAGE, METRICS_EXPORT_MESSAGE, SESSION_SUMMARY_MESSAGE,
};
use adscope::metrics::{AlertKind, AlertThresholds, MetricsAggregator};
use adscope::config::TrackingConfig;
use adscope::telemetry::{AdType, MemorySink, Severity};
use std::sync::Arc;

use super::test_utils::aggregator;

#[test]
fn mixed_session_produces_expected_rates() {
    let (mut agg, _sink) = aggregator();
    agg.start_session();

    for _ in 0..4 {
        let request = agg.track_ad_request(AdType::Interstitial, "i-1");
        agg.track_ad_load_success(AdType::Interstitial, "i-1", Some(&request));
    }
    let request = agg.track_ad_request(AdType::Interstitial, "i-1");
    agg.track_ad_load_failure(AdType::Interstitial, "i-1", "No fill", Some(&request));

    for _ in 0..4 {
        agg.track_ad_impression(AdType::Interstitial, "i-1");
    }
    agg.track_ad_click(AdType::Interstitial, "i-1");
    agg.track_rewarded_video_completion("r-1", 10, "coins");

    let m = agg.metrics();
    assert_eq!(m.ad_request_count, 5);
    assert_eq!(m.total_load_outcomes(), 5);
    assert_eq!(m.fill_rate, 80.0);
    assert_eq!(m.impression_count, 4);
    assert_eq!(m.click_through_rate, 25.0);
    assert_eq!(m.rewarded_video_completion_rate, 25.0);
    assert_eq!(m.ad_latency_secs.len(), 5);
    assert_eq!(agg.pending_requests(), 0);
}

#[test]
fn frequency_warning_fires_on_every_impression_past_limit() {
    let (mut agg, sink) = aggregator();
    agg.start_session();
    for _ in 0..6 {
        agg.track_ad_impression(AdType::Banner, "b-1");
    }
    let warnings = sink.events_named(FREQUENCY_WARNING_MESSAGE);
    assert_eq!(warnings.len(), 3);
    assert!(warnings.iter().all(|w| w.level == Severity::Warning));
    let frequencies: Vec<&str> = warnings
        .iter()
        .map(|w| w.tags["current_frequency"].as_str())
        .collect();
    assert_eq!(frequencies, vec!["4", "5", "6"]);
}

#[test]
fn configured_frequency_limit_is_used() {
    let sink = Arc::new(MemorySink::new());
    let config = TrackingConfig {
        alerts: AlertThresholds {
            max_ad_frequency_per_session: 1,
            ..AlertThresholds::default()
        },
        ..TrackingConfig::default()
    };
    let mut agg = MetricsAggregator::with_config(sink.clone(), &config);
    agg.track_ad_impression(AdType::Banner, "b-1");
    assert!(sink.events_named(FREQUENCY_WARNING_MESSAGE).is_empty());
    agg.track_ad_impression(AdType::Banner, "b-1");
    assert_eq!(sink.events_named(FREQUENCY_WARNING_MESSAGE).len(), 1);
}

#[test]
fn start_session_resets_counters_but_keeps_pending_requests() {
    let (mut agg, _sink) = aggregator();
    let request = agg.track_ad_request(AdType::Banner, "b-1");
    agg.track_ad_impression(AdType::Banner, "b-1");
    agg.start_session();

    assert_eq!(agg.metrics().impression_count, 0);
    assert_eq!(agg.metrics().ad_request_count, 0);
    assert_eq!(agg.pending_requests(), 1);

    agg.track_ad_load_success(AdType::Banner, "b-1", Some(&request));
    assert_eq!(agg.metrics().ad_latency_secs.len(), 1);
    assert_eq!(agg.metrics().fill_rate, 0.0);
}

#[test]
fn load_without_request_records_zero_latency() {
    let (mut agg, _sink) = aggregator();
    let latency = agg.track_ad_load_success(AdType::Banner, "b-1", None);
    assert!(latency.is_zero());
    let latency = agg.track_ad_load_failure(AdType::Banner, "b-1", "err", Some("req-unknown"));
    assert!(latency.is_zero());
    assert_eq!(agg.metrics().ad_latency_secs, vec![0.0, 0.0]);
}

#[test]
fn load_failure_is_captured_as_error() {
    let (mut agg, sink) = aggregator();
    agg.track_ad_load_failure(AdType::Rewarded, "r-1", "Network timeout", None);
    let errors = sink.events_at(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Network timeout");
    assert_eq!(errors[0].tags["error_type"], "ad_load_failure");
}

#[test]
fn end_session_reports_and_keeps_counters() {
    let (mut agg, sink) = aggregator();
    agg.start_session();
    agg.track_ad_impression(AdType::Banner, "b-1");
    agg.track_ad_impression(AdType::Banner, "b-1");
    agg.track_ad_click(AdType::Banner, "b-1");

    let summary = agg.end_session();
    assert_eq!(summary.total_impressions, 2);
    assert_eq!(summary.total_clicks, 1);
    assert_eq!(summary.click_through_rate, 50.0);
    assert_eq!(agg.metrics().impression_count, 2);

    let captured = sink.events_named(SESSION_SUMMARY_MESSAGE);
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].tags["final_ctr_percentage"], "50.00");
}

#[test]
fn export_captures_snapshot() {
    let (mut agg, sink) = aggregator();
    let request = agg.track_ad_request(AdType::Banner, "b-1");
    agg.track_ad_load_success(AdType::Banner, "b-1", Some(&request));
    agg.export_metrics();
    let exports = sink.events_named(METRICS_EXPORT_MESSAGE);
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].tags["fill_rate_percentage"], "100.00");
}

#[test]
fn alerts_follow_thresholds() {
    let (mut agg, _sink) = aggregator();
    assert!(agg.alerts().is_empty());
    for _ in 0..4 {
        agg.track_ad_request(AdType::Banner, "b-1");
    }
    agg.track_ad_load_success(AdType::Banner, "b-1", None);
    let kinds: Vec<AlertKind> = agg.alerts().into_iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AlertKind::LowFillRate]);
}

#[test]
fn five_impressions_one_click_is_twenty_percent() {
    let (mut agg, _sink) = aggregator();
    agg.start_session();
    for _ in 0..5 {
        agg.track_ad_impression(AdType::Banner, "b-1");
    }
    agg.track_ad_click(AdType::Banner, "b-1");
    assert_eq!(agg.metrics().click_through_rate, 20.0);
}
