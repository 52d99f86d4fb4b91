//! Event ingestion and sequence assignment.

use std::sync::{mpsc::Receiver, Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::telemetry::routing::bus::{TelemetryEnvelope, TelemetryPayload};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedRecord {
    pub seq: u64,
    pub ts: String,
    pub payload: TelemetryPayload,
}

pub struct EventIngestor {
    receiver: Receiver<TelemetryEnvelope>,
    next_seq: u64,
    records: Vec<SequencedRecord>,
}

impl EventIngestor {
    pub fn new(receiver: Receiver<TelemetryEnvelope>) -> Self {
        Self {
            receiver,
            next_seq: 1,
            records: Vec::new(),
        }
    }

    pub fn ingest_pending(&mut self) -> usize {
        let mut count = 0usize;
        while let Ok(envelope) = self.receiver.try_recv() {
            self.ingest_one(envelope);
            count += 1;
        }
        count
    }

    fn ingest_one(&mut self, envelope: TelemetryEnvelope) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.push(SequencedRecord {
            seq,
            ts: envelope.ts,
            payload: envelope.payload,
        });
    }

    pub fn records(&self) -> &[SequencedRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<SequencedRecord> {
        std::mem::take(&mut self.records)
    }
}

#[derive(Clone)]
pub struct SharedIngestor(Arc<Mutex<EventIngestor>>);

impl SharedIngestor {
    pub fn new(inner: EventIngestor) -> Self {
        Self(Arc::new(Mutex::new(inner)))
    }

    pub fn drain(&self) -> usize {
        self.0.lock().ingest_pending()
    }

    pub fn take_records(&self) -> Vec<SequencedRecord> {
        let mut guard = self.0.lock();
        guard.ingest_pending();
        guard.take_records()
    }
}
