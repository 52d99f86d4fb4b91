//! Configuration System
//!
//! Layered configuration for ad identifiers, tracking thresholds, the telemetry
//! endpoint and logging. Sources merge from built-in defaults through global and
//! workspace files to `ADSCOPE__*` environment variables.

use crate::logging::LoggingConfig;
use crate::metrics::AlertThresholds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
pub mod sources;

pub use facade::ConfigLoader;
pub use sources::properties_file::{resolve_dsn, DsnSource, ResolvedDsn, PLACEHOLDER_DSN};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdScopeConfig {
    #[serde(default)]
    pub ads: AdsConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ad network identifiers. Defaults are the network's public test units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsConfig {
    #[serde(default = "default_app_id")]
    pub app_id: String,

    #[serde(default = "default_banner_unit_id")]
    pub banner_unit_id: String,

    #[serde(default = "default_interstitial_unit_id")]
    pub interstitial_unit_id: String,

    #[serde(default = "default_rewarded_unit_id")]
    pub rewarded_unit_id: String,

    /// Reserved. No load path retries yet.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Reserved. No load path retries yet.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
}

pub(crate) fn default_app_id() -> String {
    "ca-app-pub-3940256099942544~1458002511".to_string()
}

pub(crate) fn default_banner_unit_id() -> String {
    "ca-app-pub-3940256099942544/2934735716".to_string()
}

pub(crate) fn default_interstitial_unit_id() -> String {
    "ca-app-pub-3940256099942544/4411468910".to_string()
}

pub(crate) fn default_rewarded_unit_id() -> String {
    "ca-app-pub-3940256099942544/1712485313".to_string()
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    5.0
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            banner_unit_id: default_banner_unit_id(),
            interstitial_unit_id: default_interstitial_unit_id(),
            rewarded_unit_id: default_rewarded_unit_id(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl AdsConfig {
    pub fn unit_for(&self, ad_type: crate::telemetry::AdType) -> &str {
        use crate::telemetry::AdType;
        match ad_type {
            AdType::Banner => &self.banner_unit_id,
            AdType::Interstitial => &self.interstitial_unit_id,
            AdType::Rewarded => &self.rewarded_unit_id,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("app_id", &self.app_id),
            ("banner_unit_id", &self.banner_unit_id),
            ("interstitial_unit_id", &self.interstitial_unit_id),
            ("rewarded_unit_id", &self.rewarded_unit_id),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{} cannot be empty", name));
            }
        }
        if !(self.retry_delay_secs > 0.0) {
            errors.push("retry_delay_secs must be positive".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Lifecycle and aggregation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Seconds an impression wait stays open before closing with reason `timeout`
    #[serde(default = "default_impression_timeout_secs")]
    pub impression_timeout_secs: u64,

    #[serde(default)]
    pub alerts: AlertThresholds,
}

fn default_impression_timeout_secs() -> u64 {
    10
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            impression_timeout_secs: default_impression_timeout_secs(),
            alerts: AlertThresholds::default(),
        }
    }
}

impl TrackingConfig {
    pub fn impression_timeout(&self) -> Duration {
        Duration::from_secs(self.impression_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.impression_timeout_secs == 0 {
            errors.push("impression_timeout_secs must be greater than zero".to_string());
        }
        let alerts = &self.alerts;
        if !(0.0..=100.0).contains(&alerts.min_fill_rate) {
            errors.push("alerts.min_fill_rate must be within 0..=100".to_string());
        }
        if !(0.0..=100.0).contains(&alerts.min_click_through_rate) {
            errors.push("alerts.min_click_through_rate must be within 0..=100".to_string());
        }
        if !(alerts.max_average_latency_secs > 0.0) {
            errors.push("alerts.max_average_latency_secs must be positive".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Telemetry endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Explicit DSN. When unset, properties files are searched.
    #[serde(default)]
    pub dsn: Option<String>,

    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: default_environment(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Ads(String),
    Tracking(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Ads(msg) => write!(f, "ads: {}", msg),
            ValidationError::Tracking(msg) => write!(f, "tracking: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl AdScopeConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if let Err(e) = self.ads.validate() {
            errors.extend(e.into_iter().map(ValidationError::Ads));
        }
        if let Err(e) = self.tracking.validate() {
            errors.extend(e.into_iter().map(ValidationError::Tracking));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
