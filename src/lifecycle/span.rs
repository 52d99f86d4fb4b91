//! Span handles. A handle is shared between the owning trace and whoever opened
//! it; the first finish wins and every later one is a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::telemetry::events::{AdEvent, FinishReason, SpanAttributes, SpanRecord};
use crate::telemetry::sinks::TelemetrySink;

struct SpanState {
    record: SpanRecord,
    deadline: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct SpanHandle {
    state: Arc<Mutex<SpanState>>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl std::fmt::Debug for SpanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SpanHandle")
            .field("op", &state.record.op)
            .field("transaction_id", &state.record.transaction_id)
            .field("finished", &state.record.is_finished())
            .finish()
    }
}

impl SpanHandle {
    pub(crate) fn open(
        transaction_id: &str,
        op: AdEvent,
        attributes: SpanAttributes,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self::build(Some(transaction_id.to_string()), op, attributes, Some(sink))
    }

    /// A span that belongs to no trace and reports nowhere. Handed out when a
    /// paired start names a transaction that is no longer active.
    pub(crate) fn detached(op: AdEvent, attributes: SpanAttributes) -> Self {
        Self::build(None, op, attributes, None)
    }

    fn build(
        transaction_id: Option<String>,
        op: AdEvent,
        attributes: SpanAttributes,
        sink: Option<Arc<dyn TelemetrySink>>,
    ) -> Self {
        let description = op.describe(attributes.ad_type);
        let record = SpanRecord {
            transaction_id,
            op,
            description,
            attributes,
            started_at: Utc::now(),
            ended_at: None,
            finish_reason: None,
        };
        Self {
            state: Arc::new(Mutex::new(SpanState {
                record,
                deadline: None,
            })),
            sink,
        }
    }

    pub fn op(&self) -> AdEvent {
        self.state.lock().record.op
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().record.is_finished()
    }

    pub fn is_detached(&self) -> bool {
        self.sink.is_none()
    }

    pub fn has_pending_deadline(&self) -> bool {
        self.state
            .lock()
            .deadline
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Snapshot of the span as it stands now.
    pub fn record(&self) -> SpanRecord {
        self.state.lock().record.clone()
    }

    /// Finish without a reason. Returns `false` if the span was already finished.
    pub fn finish(&self) -> bool {
        self.finish_inner(None, true)
    }

    /// Finish with a reason. Returns `false` if the span was already finished.
    pub fn finish_with_reason(&self, reason: FinishReason) -> bool {
        self.finish_inner(Some(reason), true)
    }

    fn finish_inner(&self, reason: Option<FinishReason>, cancel_deadline: bool) -> bool {
        let (snapshot, deadline) = {
            let mut state = self.state.lock();
            if state.record.is_finished() {
                return false;
            }
            state.record.ended_at = Some(Utc::now());
            state.record.finish_reason = reason;
            (state.record.clone(), state.deadline.take())
        };

        if let Some(task) = deadline {
            if cancel_deadline {
                task.abort();
            }
        }

        debug!(
            op = snapshot.op.as_str(),
            transaction_id = snapshot.transaction_id.as_deref().unwrap_or("detached"),
            finish_reason = reason.map(|r| r.as_str()).unwrap_or(""),
            "span finished"
        );
        if let Some(sink) = &self.sink {
            sink.span_finished(&snapshot);
        }
        true
    }

    /// Schedule an automatic finish with `reason` after `timeout`. The timer is
    /// cancelled by any explicit finish. Without a tokio runtime the span simply
    /// has no deadline.
    pub(crate) fn arm_deadline(&self, timeout: Duration, reason: FinishReason) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                debug!(
                    op = self.op().as_str(),
                    "no async runtime; span deadline not scheduled"
                );
                return;
            }
        };

        let handle = self.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            handle.finish_inner(Some(reason), false);
        });

        let mut state = self.state.lock();
        if state.record.is_finished() {
            task.abort();
        } else {
            state.deadline = Some(task);
        }
    }
}
