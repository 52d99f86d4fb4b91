//! In-process event bus for telemetry records.

use std::sync::mpsc::{channel, Receiver, SendError, Sender};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::telemetry::events::{CapturedEvent, SpanRecord, TransactionRecord};
use crate::telemetry::sinks::TelemetrySink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TelemetryPayload {
    Span(SpanRecord),
    Transaction(TransactionRecord),
    Event(CapturedEvent),
}

impl TelemetryPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryPayload::Span(_) => "span",
            TelemetryPayload::Transaction(_) => "transaction",
            TelemetryPayload::Event(_) => "event",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryEnvelope {
    pub ts: String,
    pub payload: TelemetryPayload,
}

impl TelemetryEnvelope {
    pub fn with_now(payload: TelemetryPayload) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            payload,
        }
    }
}

/// Sink half of the bus. Records sent after the receiver is gone are dropped
/// with a warning.
pub struct TelemetryBus {
    sender: Mutex<Sender<TelemetryEnvelope>>,
}

impl TelemetryBus {
    pub fn new_pair() -> (Self, Receiver<TelemetryEnvelope>) {
        let (sender, receiver) = channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }

    pub fn emit(&self, payload: TelemetryPayload) -> Result<(), SendError<TelemetryEnvelope>> {
        let envelope = TelemetryEnvelope::with_now(payload);
        self.sender.lock().send(envelope)
    }

    fn emit_best_effort(&self, payload: TelemetryPayload) {
        let kind = payload.kind();
        if let Err(err) = self.emit(payload) {
            warn!(kind, error = %err, "telemetry bus receiver dropped; record discarded");
        }
    }
}

impl TelemetrySink for TelemetryBus {
    fn span_finished(&self, span: &SpanRecord) {
        self.emit_best_effort(TelemetryPayload::Span(span.clone()));
    }

    fn transaction_finished(&self, transaction: TransactionRecord) {
        self.emit_best_effort(TelemetryPayload::Transaction(transaction));
    }

    fn capture(&self, event: CapturedEvent) {
        self.emit_best_effort(TelemetryPayload::Event(event));
    }
}
