//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied. Serde defaults
/// cover the rest; these keys are the ones overridden most often.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("tracking.impression_timeout_secs", 10)?
        .set_default("tracking.alerts.max_ad_frequency_per_session", 3)?
        .set_default("telemetry.environment", "development")?
        .set_default("logging.level", "info")
}
