//! Integration tests for the impression wait deadline

use std::time::Duration;

use adscope::telemetry::{AdEvent, AdPlacement, AdType, FinishReason};

use super::test_utils::tracker;

fn wait_spans(sink: &adscope::telemetry::MemorySink) -> Vec<adscope::telemetry::SpanRecord> {
    sink.spans()
        .into_iter()
        .filter(|s| s.op == AdEvent::WaitingForImpression)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn impression_wait_times_out_after_ten_seconds() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Interstitial, "i-1", AdPlacement::default());
    let span = tracker.start_waiting_for_impression(&id, AdType::Interstitial, "i-1");
    assert!(span.has_pending_deadline());

    tokio::time::sleep(Duration::from_millis(9_900)).await;
    tokio::task::yield_now().await;
    assert!(!span.is_finished());

    tokio::time::sleep(Duration::from_millis(200)).await;
    tokio::task::yield_now().await;
    assert!(span.is_finished());
    assert_eq!(span.record().finish_reason, Some(FinishReason::Timeout));

    let spans = wait_spans(&sink);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].finish_reason, Some(FinishReason::Timeout));

    // The caller finishing late changes nothing.
    tracker.finish_waiting_for_impression(&span);
    assert_eq!(span.record().finish_reason, Some(FinishReason::Timeout));
    assert_eq!(wait_spans(&sink).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn impression_before_deadline_cancels_timer() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Rewarded, "r-1", AdPlacement::default());
    let span = tracker.start_waiting_for_impression(&id, AdType::Rewarded, "r-1");

    tokio::time::sleep(Duration::from_secs(3)).await;
    tracker.finish_waiting_for_impression(&span);
    assert!(!span.has_pending_deadline());
    assert_eq!(
        span.record().finish_reason,
        Some(FinishReason::ImpressionReceived)
    );

    tokio::time::sleep(Duration::from_secs(20)).await;
    tokio::task::yield_now().await;
    let spans = wait_spans(&sink);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].finish_reason, Some(FinishReason::ImpressionReceived));
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_is_honoured() {
    let (tracker, sink) = tracker();
    let mut tracker = tracker.with_impression_timeout(Duration::from_secs(2));
    let id = tracker.start_ad_lifecycle(AdType::Interstitial, "i-1", AdPlacement::default());
    let span = tracker.start_waiting_for_impression(&id, AdType::Interstitial, "i-1");

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    tokio::task::yield_now().await;
    assert!(span.is_finished());
    assert_eq!(wait_spans(&sink)[0].finish_reason, Some(FinishReason::Timeout));
}

#[tokio::test(start_paused = true)]
async fn wait_outlives_closed_trace() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Interstitial, "i-1", AdPlacement::default());
    let span = tracker.start_waiting_for_impression(&id, AdType::Interstitial, "i-1");
    tracker.track_ad_dismiss(&id, AdType::Interstitial, "i-1");
    assert!(!tracker.is_active(&id));
    drop(span);

    tokio::time::sleep(Duration::from_secs(11)).await;
    tokio::task::yield_now().await;
    let spans = wait_spans(&sink);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].finish_reason, Some(FinishReason::Timeout));
}

#[test]
fn no_runtime_means_no_deadline() {
    let (mut tracker, _sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Interstitial, "i-1", AdPlacement::default());
    let span = tracker.start_waiting_for_impression(&id, AdType::Interstitial, "i-1");
    assert!(!span.has_pending_deadline());
    tracker.finish_waiting_for_impression(&span);
    assert_eq!(
        span.record().finish_reason,
        Some(FinishReason::ImpressionReceived)
    );
}

#[test]
fn paired_waits_on_unknown_transaction_are_detached() {
    let (mut tracker, sink) = tracker();
    let span = tracker.start_waiting_for_impression("missing", AdType::Banner, "b-1");
    assert!(span.is_detached());
    tracker.finish_waiting_for_impression(&span);
    assert!(span.is_finished());
    assert!(sink.spans().is_empty());
}
