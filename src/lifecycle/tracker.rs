//! Lifecycle tracker: maps transaction ids to open traces and turns ad SDK
//! callbacks into spans.
//!
//! Every `track_*` call naming a transaction that is not active is dropped
//! silently. Ad callbacks race UI teardown, so late and duplicate events after
//! a trace has closed are expected.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::TrackingConfig;
use crate::lifecycle::probe::{ImpactProbe, NoopProbe};
use crate::lifecycle::span::SpanHandle;
use crate::lifecycle::trace::LifecycleTrace;
use crate::telemetry::events::{
    AdEvent, AdPlacement, AdType, EventDetail, FinishReason, SessionContext, SpanAttributes,
    TerminationCause,
};
use crate::telemetry::sinks::TelemetrySink;
use crate::telemetry::new_transaction_id;

pub const DEFAULT_IMPRESSION_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LifecycleTracker {
    traces: HashMap<String, LifecycleTrace>,
    sink: Arc<dyn TelemetrySink>,
    probe: Arc<dyn ImpactProbe>,
    impression_timeout: Duration,
    session_started: Instant,
    ads_in_session: u64,
}

impl LifecycleTracker {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            traces: HashMap::new(),
            sink,
            probe: Arc::new(NoopProbe),
            impression_timeout: DEFAULT_IMPRESSION_TIMEOUT,
            session_started: Instant::now(),
            ads_in_session: 0,
        }
    }

    pub fn with_config(sink: Arc<dyn TelemetrySink>, config: &TrackingConfig) -> Self {
        Self::new(sink).with_impression_timeout(config.impression_timeout())
    }

    pub fn with_probe(mut self, probe: Arc<dyn ImpactProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_impression_timeout(mut self, timeout: Duration) -> Self {
        self.impression_timeout = timeout;
        self
    }

    pub fn impression_timeout(&self) -> Duration {
        self.impression_timeout
    }

    pub fn is_active(&self, transaction_id: &str) -> bool {
        self.traces.contains_key(transaction_id)
    }

    pub fn active_count(&self) -> usize {
        self.traces.len()
    }

    pub fn active_transactions(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.traces.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn trace(&self, transaction_id: &str) -> Option<&LifecycleTrace> {
        self.traces.get(transaction_id)
    }

    pub fn ads_in_session(&self) -> u64 {
        self.ads_in_session
    }

    /// Restart the session clock and ads-in-session counter. Open traces are kept.
    pub fn reset_session(&mut self) {
        self.session_started = Instant::now();
        self.ads_in_session = 0;
    }

    /// Open a trace and record its request span. Returns the new transaction id.
    pub fn start_ad_lifecycle(
        &mut self,
        ad_type: AdType,
        ad_unit_id: &str,
        placement: AdPlacement,
    ) -> String {
        let transaction_id = new_transaction_id(ad_type, ad_unit_id);
        self.ads_in_session += 1;
        let session = SessionContext {
            session_duration_secs: self.session_started.elapsed().as_secs_f64(),
            ads_in_session: self.ads_in_session,
        };

        let mut trace = LifecycleTrace::new(
            transaction_id.clone(),
            ad_type,
            ad_unit_id.to_string(),
            placement.clone(),
            self.probe.battery_level_percent(),
        );
        let attributes = SpanAttributes::new(ad_type, ad_unit_id)
            .with_detail(EventDetail::Request { placement, session });
        trace
            .open_child(AdEvent::Request, attributes, self.sink.clone())
            .finish();

        info!(
            transaction_id = %transaction_id,
            ad_type = ad_type.as_str(),
            ad_unit_id = %ad_unit_id,
            ads_in_session = self.ads_in_session,
            "ad lifecycle started"
        );
        self.traces.insert(transaction_id.clone(), trace);
        transaction_id
    }

    /// Record a single-shot event and close the trace if the event is terminal
    /// for the trace's ad type.
    fn track(&mut self, transaction_id: &str, event: AdEvent, attributes: SpanAttributes) {
        let Some(trace) = self.traces.get_mut(transaction_id) else {
            debug!(
                transaction_id = %transaction_id,
                event = event.as_str(),
                "event for inactive transaction dropped"
            );
            return;
        };

        trace.open_child(event, attributes, self.sink.clone()).finish();

        if trace.ad_type.terminates_on(event) {
            self.close(transaction_id, TerminationCause::TerminalEvent(event));
        }
    }

    fn close(&mut self, transaction_id: &str, cause: TerminationCause) -> bool {
        let Some(trace) = self.traces.remove(transaction_id) else {
            return false;
        };
        let record = trace.close(cause, self.probe.battery_level_percent());
        debug!(
            transaction_id = %record.transaction_id,
            cause = ?record.cause,
            spans = record.spans.len(),
            battery_impact_percent = record.battery_impact_percent.unwrap_or_default(),
            "ad lifecycle closed"
        );
        self.sink.transaction_finished(record);
        true
    }

    /// Close a trace regardless of its state, e.g. when the ad unit is replaced
    /// mid-flight. Returns `false` if the transaction was not active.
    pub fn finish_ad_lifecycle(&mut self, transaction_id: &str) -> bool {
        self.close(transaction_id, TerminationCause::Explicit)
    }

    fn simple(ad_type: AdType, ad_unit_id: &str) -> SpanAttributes {
        SpanAttributes::new(ad_type, ad_unit_id)
    }

    fn failure(ad_type: AdType, ad_unit_id: &str, error: &str) -> SpanAttributes {
        SpanAttributes::new(ad_type, ad_unit_id).with_detail(EventDetail::Failure {
            error: error.to_string(),
        })
    }

    pub fn track_ad_load_start(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::LoadStart, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_load_success(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
    ) {
        self.track(transaction_id, AdEvent::LoadSuccess, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_load_failure(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
        error: &str,
    ) {
        self.track(
            transaction_id,
            AdEvent::LoadFailure,
            Self::failure(ad_type, ad_unit_id, error),
        );
    }

    pub fn track_ad_show_start(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::ShowStart, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_show_success(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
    ) {
        self.track(transaction_id, AdEvent::ShowSuccess, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_show_failure(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
        error: &str,
    ) {
        self.track(
            transaction_id,
            AdEvent::ShowFailure,
            Self::failure(ad_type, ad_unit_id, error),
        );
    }

    pub fn track_ad_impression(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::Impression, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_click(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::Click, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_dismiss(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::Dismiss, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_exit(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::Exit, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_video_start(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::VideoStart, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_video_complete(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
    ) {
        self.track(transaction_id, AdEvent::VideoComplete, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_reward(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
        reward_amount: i64,
        reward_type: &str,
    ) {
        let attributes = SpanAttributes::new(ad_type, ad_unit_id).with_detail(EventDetail::Reward {
            amount: reward_amount,
            reward_type: reward_type.to_string(),
        });
        self.track(transaction_id, AdEvent::Reward, attributes);
    }

    pub fn track_ad_loading(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::Loading, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_display_time(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
    ) {
        self.track(transaction_id, AdEvent::DisplayTime, Self::simple(ad_type, ad_unit_id));
    }

    pub fn track_ad_processing(&mut self, transaction_id: &str, ad_type: AdType, ad_unit_id: &str) {
        self.track(transaction_id, AdEvent::Processing, Self::simple(ad_type, ad_unit_id));
    }

    /// Open a paired span the caller finishes later. Unknown transactions get a
    /// detached handle so the caller's pairing code needs no special case.
    fn open_paired(
        &mut self,
        transaction_id: &str,
        event: AdEvent,
        ad_type: AdType,
        ad_unit_id: &str,
    ) -> SpanHandle {
        let attributes = Self::simple(ad_type, ad_unit_id);
        match self.traces.get_mut(transaction_id) {
            Some(trace) => trace.open_child(event, attributes, self.sink.clone()),
            None => {
                debug!(
                    transaction_id = %transaction_id,
                    event = event.as_str(),
                    "paired span for inactive transaction is detached"
                );
                SpanHandle::detached(event, attributes)
            }
        }
    }

    pub fn start_ad_loading(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
    ) -> SpanHandle {
        self.open_paired(transaction_id, AdEvent::Loading, ad_type, ad_unit_id)
    }

    pub fn finish_ad_loading(&self, span: &SpanHandle) {
        span.finish();
    }

    /// Open the impression wait. It closes itself with reason `timeout` once the
    /// impression timeout elapses unless `finish_waiting_for_impression` wins first.
    pub fn start_waiting_for_impression(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
    ) -> SpanHandle {
        let span = self.open_paired(
            transaction_id,
            AdEvent::WaitingForImpression,
            ad_type,
            ad_unit_id,
        );
        if !span.is_detached() {
            span.arm_deadline(self.impression_timeout, FinishReason::Timeout);
        }
        span
    }

    pub fn finish_waiting_for_impression(&self, span: &SpanHandle) {
        span.finish_with_reason(FinishReason::ImpressionReceived);
    }

    pub fn start_waiting_for_load_success(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
    ) -> SpanHandle {
        self.open_paired(
            transaction_id,
            AdEvent::WaitingForLoadSuccess,
            ad_type,
            ad_unit_id,
        )
    }

    pub fn finish_waiting_for_load_success(&self, span: &SpanHandle) {
        span.finish();
    }

    pub fn start_ad_display_time(
        &mut self,
        transaction_id: &str,
        ad_type: AdType,
        ad_unit_id: &str,
    ) -> SpanHandle {
        self.open_paired(transaction_id, AdEvent::DisplayTime, ad_type, ad_unit_id)
    }

    pub fn finish_ad_display_time(&self, span: &SpanHandle) {
        span.finish();
    }
}
