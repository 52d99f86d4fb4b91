//! Telemetry domain: shared event vocabulary, records, sinks and routing.

mod types;

pub mod events;
pub mod routing;
pub mod sinks;

pub use events::{
    AdEvent, AdPlacement, AdType, CapturedEvent, EventDetail, FinishReason, SessionContext,
    Severity, SpanAttributes, SpanRecord, TerminationCause, TransactionRecord,
};
pub use sinks::{FanoutSink, LogSink, MemorySink, TelemetrySink};
pub use types::{new_request_id, new_transaction_id, now_millis};
