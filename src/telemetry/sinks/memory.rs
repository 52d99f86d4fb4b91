//! In-memory sink that keeps every record it receives.

use parking_lot::Mutex;

use crate::telemetry::events::{CapturedEvent, Severity, SpanRecord, TransactionRecord};
use crate::telemetry::sinks::TelemetrySink;

#[derive(Debug, Default)]
pub struct MemorySink {
    spans: Mutex<Vec<SpanRecord>>,
    transactions: Mutex<Vec<TransactionRecord>>,
    events: Mutex<Vec<CapturedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().clone()
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.transactions.lock().clone()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    pub fn events_at(&self, level: Severity) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    pub fn events_named(&self, message: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.message == message)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.spans.lock().clear();
        self.transactions.lock().clear();
        self.events.lock().clear();
    }
}

impl TelemetrySink for MemorySink {
    fn span_finished(&self, span: &SpanRecord) {
        self.spans.lock().push(span.clone());
    }

    fn transaction_finished(&self, transaction: TransactionRecord) {
        self.transactions.lock().push(transaction);
    }

    fn capture(&self, event: CapturedEvent) {
        self.events.lock().push(event);
    }
}
