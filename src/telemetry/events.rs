//! Event vocabulary shared by the lifecycle tracker and the metrics aggregator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ad format. Decides which event closes a lifecycle trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdType {
    Banner,
    Interstitial,
    Rewarded,
}

impl AdType {
    pub const ALL: [AdType; 3] = [AdType::Banner, AdType::Interstitial, AdType::Rewarded];

    pub fn as_str(self) -> &'static str {
        match self {
            AdType::Banner => "banner",
            AdType::Interstitial => "interstitial",
            AdType::Rewarded => "rewarded",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AdType::Banner => "Banner",
            AdType::Interstitial => "Interstitial",
            AdType::Rewarded => "Rewarded",
        }
    }

    /// Whether `event` ends a lifecycle trace of this type.
    pub fn terminates_on(self, event: AdEvent) -> bool {
        match self {
            AdType::Banner => matches!(event, AdEvent::LoadSuccess | AdEvent::LoadFailure),
            AdType::Interstitial => matches!(
                event,
                AdEvent::ShowSuccess | AdEvent::ShowFailure | AdEvent::Dismiss
            ),
            AdType::Rewarded => matches!(
                event,
                AdEvent::VideoComplete | AdEvent::ShowFailure | AdEvent::Dismiss
            ),
        }
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "banner" => Ok(AdType::Banner),
            "interstitial" => Ok(AdType::Interstitial),
            "rewarded" => Ok(AdType::Rewarded),
            other => Err(format!("unknown ad type '{other}'")),
        }
    }
}

/// Where in the app an ad was requested. Descriptive only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdPlacement {
    AppLaunch,
    BetweenLevels,
    #[default]
    NaturalBreak,
    Achievement,
    SessionEnd,
    Custom(String),
}

impl AdPlacement {
    pub fn as_str(&self) -> &str {
        match self {
            AdPlacement::AppLaunch => "app_launch",
            AdPlacement::BetweenLevels => "between_levels",
            AdPlacement::NaturalBreak => "natural_break",
            AdPlacement::Achievement => "achievement",
            AdPlacement::SessionEnd => "session_end",
            AdPlacement::Custom(name) => name,
        }
    }
}

impl From<&str> for AdPlacement {
    fn from(name: &str) -> Self {
        match name {
            "app_launch" => AdPlacement::AppLaunch,
            "between_levels" => AdPlacement::BetweenLevels,
            "natural_break" => AdPlacement::NaturalBreak,
            "achievement" => AdPlacement::Achievement,
            "session_end" => AdPlacement::SessionEnd,
            other => AdPlacement::Custom(other.to_string()),
        }
    }
}

/// One kind of lifecycle event; each becomes a span operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdEvent {
    Request,
    LoadStart,
    LoadSuccess,
    LoadFailure,
    ShowStart,
    ShowSuccess,
    ShowFailure,
    Impression,
    Click,
    Dismiss,
    Exit,
    VideoStart,
    VideoComplete,
    Reward,
    Loading,
    WaitingForImpression,
    WaitingForLoadSuccess,
    DisplayTime,
    Processing,
}

impl AdEvent {
    /// Span operation label.
    pub fn as_str(self) -> &'static str {
        match self {
            AdEvent::Request => "ad_request",
            AdEvent::LoadStart => "ad_load_start",
            AdEvent::LoadSuccess => "ad_load_success",
            AdEvent::LoadFailure => "ad_load_failure",
            AdEvent::ShowStart => "ad_show_start",
            AdEvent::ShowSuccess => "ad_show_success",
            AdEvent::ShowFailure => "ad_show_failure",
            AdEvent::Impression => "ad_impression",
            AdEvent::Click => "ad_click",
            AdEvent::Dismiss => "ad_dismiss",
            AdEvent::Exit => "ad_exit",
            AdEvent::VideoStart => "ad_video_start",
            AdEvent::VideoComplete => "ad_video_complete",
            AdEvent::Reward => "ad_reward",
            AdEvent::Loading => "ad_loading",
            AdEvent::WaitingForImpression => "ad_waiting_for_impression",
            AdEvent::WaitingForLoadSuccess => "ad_waiting_for_load_success",
            AdEvent::DisplayTime => "ad_display_time",
            AdEvent::Processing => "ad_processing",
        }
    }

    /// Human-readable span description for this event on an ad of `ad_type`.
    pub fn describe(self, ad_type: AdType) -> String {
        let lower = ad_type.as_str();
        let title = ad_type.display_name();
        match self {
            AdEvent::Request => format!("Request {lower} ad"),
            AdEvent::LoadStart => format!("Start loading {lower} ad"),
            AdEvent::LoadSuccess => format!("{title} ad loaded successfully"),
            AdEvent::LoadFailure => format!("{title} ad failed to load"),
            AdEvent::ShowStart => format!("Start showing {lower} ad"),
            AdEvent::ShowSuccess => format!("{title} ad shown successfully"),
            AdEvent::ShowFailure => format!("{title} ad failed to show"),
            AdEvent::Impression => format!("{title} ad impression recorded"),
            AdEvent::Click => format!("{title} ad clicked"),
            AdEvent::Dismiss => format!("{title} ad dismissed"),
            AdEvent::Exit => format!("{title} ad exited"),
            AdEvent::VideoStart => format!("{title} ad video started"),
            AdEvent::VideoComplete => format!("{title} ad video completed"),
            AdEvent::Reward => format!("{title} ad reward earned"),
            AdEvent::Loading => format!("{title} ad loading from network"),
            AdEvent::WaitingForImpression => format!("{title} ad waiting for impression"),
            AdEvent::WaitingForLoadSuccess => format!("{title} ad waiting for load success"),
            AdEvent::DisplayTime => format!("{title} ad displayed to user"),
            AdEvent::Processing => format!("{title} ad processing time"),
        }
    }
}

impl fmt::Display for AdEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a paired wait span was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Timeout,
    ImpressionReceived,
}

impl FinishReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Timeout => "timeout",
            FinishReason::ImpressionReceived => "impression_received",
        }
    }
}

/// Session context stamped on every request span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_duration_secs: f64,
    pub ads_in_session: u64,
}

/// Event-specific span data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetail {
    #[default]
    None,
    Request {
        placement: AdPlacement,
        session: SessionContext,
    },
    Failure {
        error: String,
    },
    Reward {
        amount: i64,
        reward_type: String,
    },
}

/// Typed span attributes. `to_tags` flattens them for sinks that only take strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanAttributes {
    pub ad_type: AdType,
    pub ad_unit_id: String,
    #[serde(default)]
    pub detail: EventDetail,
}

impl SpanAttributes {
    pub fn new(ad_type: AdType, ad_unit_id: impl Into<String>) -> Self {
        Self {
            ad_type,
            ad_unit_id: ad_unit_id.into(),
            detail: EventDetail::None,
        }
    }

    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn to_tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert("ad_type".to_string(), self.ad_type.as_str().to_string());
        tags.insert("ad_unit_id".to_string(), self.ad_unit_id.clone());
        match &self.detail {
            EventDetail::None => {}
            EventDetail::Request { placement, session } => {
                tags.insert("placement".to_string(), placement.as_str().to_string());
                tags.insert(
                    "session_duration_seconds".to_string(),
                    format!("{:.2}", session.session_duration_secs),
                );
                tags.insert(
                    "ads_in_session".to_string(),
                    session.ads_in_session.to_string(),
                );
            }
            EventDetail::Failure { error } => {
                tags.insert("error".to_string(), error.clone());
            }
            EventDetail::Reward {
                amount,
                reward_type,
            } => {
                tags.insert("reward_amount".to_string(), amount.to_string());
                tags.insert("reward_type".to_string(), reward_type.clone());
            }
        }
        tags
    }
}

/// A span as handed to a sink once it has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    /// `None` for detached spans opened against an unknown transaction.
    pub transaction_id: Option<String>,
    pub op: AdEvent,
    pub description: String,
    pub attributes: SpanAttributes,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl SpanRecord {
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// How a lifecycle trace came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", content = "event", rename_all = "snake_case")]
pub enum TerminationCause {
    TerminalEvent(AdEvent),
    Explicit,
}

/// A closed lifecycle trace with the spans it held at close time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub name: String,
    pub op: String,
    pub ad_type: AdType,
    pub ad_unit_id: String,
    pub placement: AdPlacement,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub cause: TerminationCause,
    pub spans: Vec<SpanRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_impact_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

/// A discrete telemetry event: message, severity and string tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedEvent {
    pub message: String,
    pub level: Severity,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl CapturedEvent {
    pub fn new(message: impl Into<String>, level: Severity) -> Self {
        Self {
            message: message.into(),
            level,
            tags: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.tags.insert(key.into(), value.to_string());
        self
    }

    pub fn tag_pct(self, key: impl Into<String>, value: f64) -> Self {
        self.tag(key, format!("{value:.2}"))
    }
}
