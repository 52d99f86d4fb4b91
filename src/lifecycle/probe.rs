//! Device impact readings taken when a lifecycle opens and closes, and on
//! each request, load failure and impression the metrics aggregator sees.

/// Source of device readings. Implementations must be cheap; they are called
/// on the tracking path.
pub trait ImpactProbe: Send + Sync {
    /// Battery charge in percent, if the platform exposes it.
    fn battery_level_percent(&self) -> Option<f64>;

    /// Resident memory of the host process in megabytes.
    fn memory_usage_mb(&self) -> Option<f64> {
        None
    }
}

/// Probe for platforms without battery readings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

impl ImpactProbe for NoopProbe {
    fn battery_level_percent(&self) -> Option<f64> {
        None
    }
}

/// Battery drained between two readings, clamped at zero (charging does not
/// count as negative impact).
pub fn battery_delta(start: Option<f64>, end: Option<f64>) -> Option<f64> {
    match (start, end) {
        (Some(start), Some(end)) => Some((start - end).max(0.0)),
        _ => None,
    }
}
