//! Integration tests for per-ad-type trace termination

use std::collections::HashSet;

use adscope::telemetry::{AdEvent, AdPlacement, AdType, EventDetail, TerminationCause};

use super::test_utils::tracker;

#[test]
fn banner_closes_on_load_failure() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Banner, "b-1", AdPlacement::AppLaunch);
    tracker.track_ad_load_start(&id, AdType::Banner, "b-1");
    tracker.track_ad_load_failure(&id, AdType::Banner, "b-1", "Network error");

    assert!(!tracker.is_active(&id));
    let transactions = sink.transactions();
    assert_eq!(transactions.len(), 1);
    let tx = &transactions[0];
    assert_eq!(tx.cause, TerminationCause::TerminalEvent(AdEvent::LoadFailure));
    assert_eq!(tx.name, "ad_lifecycle_banner");
    let ops: Vec<AdEvent> = tx.spans.iter().map(|s| s.op).collect();
    assert_eq!(
        ops,
        vec![AdEvent::Request, AdEvent::LoadStart, AdEvent::LoadFailure]
    );
    assert_eq!(
        tx.spans[2].attributes.detail,
        EventDetail::Failure {
            error: "Network error".to_string()
        }
    );
}

#[test]
fn interstitial_survives_load_and_closes_on_show_success() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Interstitial, "i-1", AdPlacement::BetweenLevels);
    tracker.track_ad_load_start(&id, AdType::Interstitial, "i-1");
    tracker.track_ad_load_success(&id, AdType::Interstitial, "i-1");
    assert!(tracker.is_active(&id));

    tracker.track_ad_show_start(&id, AdType::Interstitial, "i-1");
    tracker.track_ad_impression(&id, AdType::Interstitial, "i-1");
    assert!(tracker.is_active(&id));
    tracker.track_ad_show_success(&id, AdType::Interstitial, "i-1");

    assert!(!tracker.is_active(&id));
    assert_eq!(
        sink.transactions()[0].cause,
        TerminationCause::TerminalEvent(AdEvent::ShowSuccess)
    );
}

#[test]
fn interstitial_load_failure_keeps_trace_open() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Interstitial, "i-1", AdPlacement::default());
    tracker.track_ad_load_failure(&id, AdType::Interstitial, "i-1", "No fill");
    assert!(tracker.is_active(&id));
    assert!(sink.transactions().is_empty());

    assert!(tracker.finish_ad_lifecycle(&id));
    assert_eq!(sink.transactions()[0].cause, TerminationCause::Explicit);
}

#[test]
fn interstitial_closes_on_dismiss() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Interstitial, "i-1", AdPlacement::default());
    tracker.track_ad_dismiss(&id, AdType::Interstitial, "i-1");
    assert!(!tracker.is_active(&id));
    assert_eq!(
        sink.transactions()[0].cause,
        TerminationCause::TerminalEvent(AdEvent::Dismiss)
    );
}

#[test]
fn rewarded_waits_for_video_complete() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Rewarded, "r-1", AdPlacement::Achievement);
    for event in [AdEvent::LoadSuccess, AdEvent::ShowSuccess, AdEvent::Impression] {
        match event {
            AdEvent::LoadSuccess => tracker.track_ad_load_success(&id, AdType::Rewarded, "r-1"),
            AdEvent::ShowSuccess => tracker.track_ad_show_success(&id, AdType::Rewarded, "r-1"),
            _ => tracker.track_ad_impression(&id, AdType::Rewarded, "r-1"),
        }
        assert!(tracker.is_active(&id), "{event} must not close a rewarded trace");
    }
    tracker.track_ad_video_start(&id, AdType::Rewarded, "r-1");
    tracker.track_ad_reward(&id, AdType::Rewarded, "r-1", 25, "gems");
    assert!(tracker.is_active(&id));
    tracker.track_ad_video_complete(&id, AdType::Rewarded, "r-1");

    assert!(!tracker.is_active(&id));
    let tx = &sink.transactions()[0];
    assert_eq!(tx.cause, TerminationCause::TerminalEvent(AdEvent::VideoComplete));
    let reward = tx
        .spans
        .iter()
        .find(|s| s.op == AdEvent::Reward)
        .expect("reward span");
    assert_eq!(reward.attributes.to_tags()["reward_amount"], "25");
    assert_eq!(reward.attributes.to_tags()["reward_type"], "gems");
}

#[test]
fn rewarded_closes_on_show_failure() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Rewarded, "r-1", AdPlacement::default());
    tracker.track_ad_show_failure(&id, AdType::Rewarded, "r-1", "Presentation blocked");
    assert!(!tracker.is_active(&id));
    assert_eq!(
        sink.transactions()[0].cause,
        TerminationCause::TerminalEvent(AdEvent::ShowFailure)
    );
}

#[test]
fn events_after_close_are_silently_dropped() {
    let (mut tracker, sink) = tracker();
    let id = tracker.start_ad_lifecycle(AdType::Banner, "b-1", AdPlacement::default());
    tracker.track_ad_load_success(&id, AdType::Banner, "b-1");
    let spans_after_close = sink.spans().len();

    tracker.track_ad_click(&id, AdType::Banner, "b-1");
    tracker.track_ad_impression(&id, AdType::Banner, "b-1");
    assert!(!tracker.finish_ad_lifecycle(&id));

    assert_eq!(sink.spans().len(), spans_after_close);
    assert_eq!(sink.transactions().len(), 1);
}

#[test]
fn unknown_transaction_changes_nothing() {
    let (mut tracker, sink) = tracker();
    let live = tracker.start_ad_lifecycle(AdType::Interstitial, "i-1", AdPlacement::default());
    let before = sink.spans().len();

    tracker.track_ad_load_success("not-a-transaction", AdType::Interstitial, "i-1");
    tracker.track_ad_dismiss("not-a-transaction", AdType::Interstitial, "i-1");

    assert_eq!(sink.spans().len(), before);
    assert!(sink.transactions().is_empty());
    assert_eq!(tracker.active_transactions(), vec![live.as_str()]);
}

#[test]
fn transaction_ids_are_unique_and_prefixed() {
    let (mut tracker, _sink) = tracker();
    let ids: Vec<String> = (0..50)
        .map(|_| tracker.start_ad_lifecycle(AdType::Banner, "unit", AdPlacement::default()))
        .collect();
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    assert!(ids.iter().all(|id| id.starts_with("banner_unit_")));
    assert_eq!(tracker.active_count(), 50);
}

#[test]
fn request_span_carries_placement_and_session_counter() {
    let (mut tracker, sink) = tracker();
    tracker.start_ad_lifecycle(AdType::Banner, "b-1", AdPlacement::AppLaunch);
    tracker.start_ad_lifecycle(AdType::Banner, "b-1", AdPlacement::Custom("shop".to_string()));
    let requests: Vec<_> = sink
        .spans()
        .into_iter()
        .filter(|s| s.op == AdEvent::Request)
        .collect();
    assert_eq!(requests.len(), 2);
    let tags = requests[1].attributes.to_tags();
    assert_eq!(tags["placement"], "shop");
    assert_eq!(tags["ads_in_session"], "2");
}
