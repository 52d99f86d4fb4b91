//! In-process routing: a channel-backed sink and the ingestor draining it.

pub mod bus;
pub mod ingestor;

pub use bus::{TelemetryBus, TelemetryEnvelope, TelemetryPayload};
pub use ingestor::{EventIngestor, SequencedRecord, SharedIngestor};
