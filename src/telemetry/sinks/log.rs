//! Sink that writes telemetry records through `tracing`.

use tracing::{debug, error, info, warn};

use crate::telemetry::events::{CapturedEvent, Severity, SpanRecord, TransactionRecord};
use crate::telemetry::sinks::TelemetrySink;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn span_finished(&self, span: &SpanRecord) {
        debug!(
            transaction_id = span.transaction_id.as_deref().unwrap_or("detached"),
            op = span.op.as_str(),
            description = %span.description,
            duration_ms = span.duration_ms().unwrap_or_default(),
            finish_reason = span.finish_reason.map(|r| r.as_str()).unwrap_or(""),
            "span finished"
        );
    }

    fn transaction_finished(&self, transaction: TransactionRecord) {
        info!(
            transaction_id = %transaction.transaction_id,
            name = %transaction.name,
            ad_unit_id = %transaction.ad_unit_id,
            spans = transaction.spans.len(),
            duration_ms = (transaction.ended_at - transaction.started_at).num_milliseconds(),
            "ad lifecycle finished"
        );
    }

    fn capture(&self, event: CapturedEvent) {
        let tags = serde_json::to_string(&event.tags).unwrap_or_default();
        match event.level {
            Severity::Debug => debug!(tags = %tags, "{}", event.message),
            Severity::Info => info!(tags = %tags, "{}", event.message),
            Severity::Warning => warn!(tags = %tags, "{}", event.message),
            Severity::Error | Severity::Fatal => error!(tags = %tags, "{}", event.message),
        }
    }
}
