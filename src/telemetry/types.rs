//! Shared telemetry helpers: timestamps and identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::telemetry::events::AdType;

static TRANSACTION_COUNTER: AtomicU64 = AtomicU64::new(1);
static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Current time as milliseconds since Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a lifecycle transaction id. The process-wide counter never repeats,
/// so an id is never handed out twice even after its trace is evicted.
pub fn new_transaction_id(ad_type: AdType, ad_unit_id: &str) -> String {
    let ts = now_millis();
    let pid = std::process::id();
    let seq = TRANSACTION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{ad_unit_id}_{ts}-{pid}-{seq}", ad_type.as_str())
}

/// Generate a per-request id used to correlate load latency.
pub fn new_request_id() -> String {
    let ts = now_millis();
    let pid = std::process::id();
    let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("req-{ts}-{pid}-{seq}")
}
