//! Ad lifecycle tracing: traces keyed by transaction id, their spans, and the
//! per-ad-type termination rules.

pub mod probe;
pub mod span;
pub mod trace;
pub mod tracker;

pub use probe::{ImpactProbe, NoopProbe};
pub use span::SpanHandle;
pub use trace::LifecycleTrace;
pub use tracker::{LifecycleTracker, DEFAULT_IMPRESSION_TIMEOUT};
