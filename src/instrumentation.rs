//! SDK callback glue.
//!
//! Ad SDKs report progress through delegate callbacks. `AdInstrumentation`
//! maps each callback onto both the lifecycle tracker and the metrics
//! aggregator so neither has to be driven by hand.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lifecycle::{LifecycleTracker, SpanHandle};
use crate::metrics::MetricsAggregator;
use crate::telemetry::{AdPlacement, AdType};

/// Callbacks an ad SDK delivers for one ad instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum SdkCallback {
    Loaded,
    LoadFailed { error: String },
    Presenting,
    Impression,
    Click,
    Dismissed,
    PresentFailed { error: String },
    RewardEarned { amount: i64, reward_type: String },
}

impl SdkCallback {
    pub fn name(&self) -> &'static str {
        match self {
            SdkCallback::Loaded => "loaded",
            SdkCallback::LoadFailed { .. } => "load_failed",
            SdkCallback::Presenting => "presenting",
            SdkCallback::Impression => "impression",
            SdkCallback::Click => "click",
            SdkCallback::Dismissed => "dismissed",
            SdkCallback::PresentFailed { .. } => "present_failed",
            SdkCallback::RewardEarned { .. } => "reward_earned",
        }
    }
}

struct InFlight {
    ad_type: AdType,
    ad_unit_id: String,
    request_id: String,
    load_wait: Option<SpanHandle>,
    impression_wait: Option<SpanHandle>,
    display: Option<SpanHandle>,
}

impl InFlight {
    /// Close the impression wait and display span so they land in the trace
    /// before a terminal event snapshots it.
    fn finish_open_spans(&mut self, tracker: &LifecycleTracker) {
        if let Some(span) = self.impression_wait.take() {
            tracker.finish_waiting_for_impression(&span);
        }
        if let Some(span) = self.display.take() {
            tracker.finish_ad_display_time(&span);
        }
    }
}

pub struct AdInstrumentation {
    tracker: LifecycleTracker,
    metrics: MetricsAggregator,
    in_flight: HashMap<String, InFlight>,
}

impl AdInstrumentation {
    pub fn new(tracker: LifecycleTracker, metrics: MetricsAggregator) -> Self {
        Self {
            tracker,
            metrics,
            in_flight: HashMap::new(),
        }
    }

    pub fn tracker(&self) -> &LifecycleTracker {
        &self.tracker
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut MetricsAggregator {
        &mut self.metrics
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start a new ad: opens the lifecycle trace, counts the request and
    /// records the load start. Returns the transaction id for later callbacks.
    pub fn begin(&mut self, ad_type: AdType, ad_unit_id: &str, placement: AdPlacement) -> String {
        let transaction_id = self.tracker.start_ad_lifecycle(ad_type, ad_unit_id, placement);
        let request_id = self.metrics.track_ad_request(ad_type, ad_unit_id);
        self.tracker
            .track_ad_load_start(&transaction_id, ad_type, ad_unit_id);
        let load_wait =
            self.tracker
                .start_waiting_for_load_success(&transaction_id, ad_type, ad_unit_id);

        self.in_flight.insert(
            transaction_id.clone(),
            InFlight {
                ad_type,
                ad_unit_id: ad_unit_id.to_string(),
                request_id,
                load_wait: Some(load_wait),
                impression_wait: None,
                display: None,
            },
        );
        transaction_id
    }

    /// Apply one callback. Returns `false` when the ad is unknown or was
    /// already released by a dismiss or failure.
    ///
    /// The entry outlives its trace: interstitials close on show success and
    /// rewarded ads on video completion, but clicks and the dismiss still follow.
    pub fn handle(&mut self, transaction_id: &str, callback: SdkCallback) -> bool {
        let Some(mut ad) = self.in_flight.remove(transaction_id) else {
            debug!(
                transaction_id = %transaction_id,
                callback = callback.name(),
                "callback for unknown ad ignored"
            );
            return false;
        };
        let (ad_type, unit) = (ad.ad_type, ad.ad_unit_id.clone());
        let tracker = &mut self.tracker;
        let metrics = &mut self.metrics;
        let mut released = false;

        match callback {
            SdkCallback::Loaded => {
                if let Some(span) = ad.load_wait.take() {
                    tracker.finish_waiting_for_load_success(&span);
                }
                tracker.track_ad_load_success(transaction_id, ad_type, &unit);
                metrics.track_ad_load_success(ad_type, &unit, Some(&ad.request_id));
            }
            SdkCallback::LoadFailed { error } => {
                if let Some(span) = ad.load_wait.take() {
                    tracker.finish_waiting_for_load_success(&span);
                }
                tracker.track_ad_load_failure(transaction_id, ad_type, &unit, &error);
                // Only banners terminate on a failed load. Close the rest here.
                tracker.finish_ad_lifecycle(transaction_id);
                metrics.track_ad_load_failure(ad_type, &unit, &error, Some(&ad.request_id));
                released = true;
            }
            SdkCallback::Presenting => {
                tracker.track_ad_show_start(transaction_id, ad_type, &unit);
                ad.impression_wait =
                    Some(tracker.start_waiting_for_impression(transaction_id, ad_type, &unit));
                ad.display = Some(tracker.start_ad_display_time(transaction_id, ad_type, &unit));
                if ad_type == AdType::Rewarded {
                    tracker.track_ad_video_start(transaction_id, ad_type, &unit);
                }
            }
            SdkCallback::Impression => {
                if let Some(span) = ad.impression_wait.take() {
                    tracker.finish_waiting_for_impression(&span);
                }
                tracker.track_ad_impression(transaction_id, ad_type, &unit);
                if ad_type == AdType::Interstitial {
                    ad.finish_open_spans(tracker);
                }
                tracker.track_ad_show_success(transaction_id, ad_type, &unit);
                metrics.track_ad_impression(ad_type, &unit);
            }
            SdkCallback::Click => {
                tracker.track_ad_click(transaction_id, ad_type, &unit);
                metrics.track_ad_click(ad_type, &unit);
            }
            SdkCallback::RewardEarned {
                amount,
                reward_type,
            } => {
                tracker.track_ad_reward(transaction_id, ad_type, &unit, amount, &reward_type);
                ad.finish_open_spans(tracker);
                tracker.track_ad_video_complete(transaction_id, ad_type, &unit);
                metrics.track_rewarded_video_completion(&unit, amount, &reward_type);
            }
            SdkCallback::Dismissed => {
                ad.finish_open_spans(tracker);
                tracker.track_ad_dismiss(transaction_id, ad_type, &unit);
                released = true;
            }
            SdkCallback::PresentFailed { error } => {
                ad.finish_open_spans(tracker);
                tracker.track_ad_show_failure(transaction_id, ad_type, &unit, &error);
                released = true;
            }
        }

        if released {
            debug!(transaction_id = %transaction_id, "ad instrumentation released");
        } else {
            self.in_flight.insert(transaction_id.to_string(), ad);
        }
        true
    }

    /// Forget an ad that will report nothing more, such as a banner taken off
    /// screen or a full-screen ad whose dismiss never arrives.
    pub fn release(&mut self, transaction_id: &str) -> bool {
        self.tracker.finish_ad_lifecycle(transaction_id);
        self.in_flight.remove(transaction_id).is_some()
    }
}
