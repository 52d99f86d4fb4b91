//! Forwards every record to several sinks in order.

use std::sync::Arc;

use crate::telemetry::events::{CapturedEvent, SpanRecord, TransactionRecord};
use crate::telemetry::sinks::TelemetrySink;

#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }
}

impl TelemetrySink for FanoutSink {
    fn span_finished(&self, span: &SpanRecord) {
        for sink in &self.sinks {
            sink.span_finished(span);
        }
    }

    fn transaction_finished(&self, transaction: TransactionRecord) {
        for sink in &self.sinks {
            sink.transaction_finished(transaction.clone());
        }
    }

    fn capture(&self, event: CapturedEvent) {
        for sink in &self.sinks {
            sink.capture(event.clone());
        }
    }
}
