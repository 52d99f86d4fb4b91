//! Telemetry sinks. A sink accepts finished spans, closed transactions and
//! discrete events; delivery is its own problem and never fails the caller.

pub mod fanout;
pub mod log;
pub mod memory;

use crate::telemetry::events::{CapturedEvent, SpanRecord, TransactionRecord};

pub use fanout::FanoutSink;
pub use log::LogSink;
pub use memory::MemorySink;

pub trait TelemetrySink: Send + Sync {
    fn span_finished(&self, span: &SpanRecord);

    fn transaction_finished(&self, transaction: TransactionRecord);

    fn capture(&self, event: CapturedEvent);
}
