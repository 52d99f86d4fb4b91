//! One ad's request-to-close trace.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::lifecycle::probe::battery_delta;
use crate::lifecycle::span::SpanHandle;
use crate::telemetry::events::{
    AdEvent, AdPlacement, AdType, SpanAttributes, TerminationCause, TransactionRecord,
};
use crate::telemetry::sinks::TelemetrySink;

pub const LIFECYCLE_OP: &str = "ad.lifecycle";

#[derive(Debug)]
pub struct LifecycleTrace {
    pub transaction_id: String,
    pub ad_type: AdType,
    pub ad_unit_id: String,
    pub placement: AdPlacement,
    pub started_at: DateTime<Utc>,
    spans: Vec<SpanHandle>,
    battery_at_start: Option<f64>,
}

impl LifecycleTrace {
    pub(crate) fn new(
        transaction_id: String,
        ad_type: AdType,
        ad_unit_id: String,
        placement: AdPlacement,
        battery_at_start: Option<f64>,
    ) -> Self {
        Self {
            transaction_id,
            ad_type,
            ad_unit_id,
            placement,
            started_at: Utc::now(),
            spans: Vec::new(),
            battery_at_start,
        }
    }

    pub fn name(&self) -> String {
        format!("ad_lifecycle_{}", self.ad_type.as_str())
    }

    pub(crate) fn open_child(
        &mut self,
        op: AdEvent,
        attributes: SpanAttributes,
        sink: Arc<dyn TelemetrySink>,
    ) -> SpanHandle {
        let span = SpanHandle::open(&self.transaction_id, op, attributes, sink);
        self.spans.push(span.clone());
        span
    }

    pub fn spans(&self) -> &[SpanHandle] {
        &self.spans
    }

    pub fn open_spans(&self) -> usize {
        self.spans.iter().filter(|s| !s.is_finished()).count()
    }

    /// Consume the trace into its transaction record. Spans still open keep
    /// running through their handles; the record carries their state at close.
    pub(crate) fn close(
        self,
        cause: TerminationCause,
        battery_at_end: Option<f64>,
    ) -> TransactionRecord {
        TransactionRecord {
            name: self.name(),
            op: LIFECYCLE_OP.to_string(),
            transaction_id: self.transaction_id,
            ad_type: self.ad_type,
            ad_unit_id: self.ad_unit_id,
            placement: self.placement,
            started_at: self.started_at,
            ended_at: Utc::now(),
            cause,
            spans: self.spans.iter().map(SpanHandle::record).collect(),
            battery_impact_percent: battery_delta(self.battery_at_start, battery_at_end),
        }
    }
}
