//! Replay scripts: JSON lines of session steps and SDK callbacks, driven through
//! `AdInstrumentation` on the current tokio runtime.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{AdScopeConfig, AdsConfig};
use crate::error::AdScopeError;
use crate::instrumentation::{AdInstrumentation, SdkCallback};
use crate::lifecycle::LifecycleTracker;
use crate::metrics::{
    AdMetrics, LatencyDistribution, MetricsAggregator, PerformanceAlert, SessionSummary,
};
use crate::telemetry::routing::{EventIngestor, SharedIngestor, TelemetryBus, TelemetryPayload};
use crate::telemetry::{
    AdPlacement, AdType, CapturedEvent, FanoutSink, LogSink, SpanRecord, TelemetrySink,
    TransactionRecord,
};

/// One script line. `label` names an ad so later callbacks can refer to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    StartSession,
    EndSession,
    Begin {
        label: String,
        ad_type: AdType,
        #[serde(default)]
        ad_unit_id: Option<String>,
        #[serde(default)]
        placement: Option<String>,
    },
    Callback {
        label: String,
        #[serde(flatten)]
        callback: SdkCallback,
    },
    Wait {
        seconds: f64,
    },
    Export,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub step: ScriptStep,
}

/// Parse script text. Blank lines and lines starting with `#` are skipped.
pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>, AdScopeError> {
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: ScriptStep =
            serde_json::from_str(trimmed).map_err(|e| AdScopeError::ScriptError {
                line,
                message: e.to_string(),
            })?;
        if let ScriptStep::Wait { seconds } = step {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(AdScopeError::ScriptError {
                    line,
                    message: format!("wait must be a non-negative number of seconds, got {}", seconds),
                });
            }
        }
        lines.push(ScriptLine { line, step });
    }
    Ok(lines)
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptLine>, AdScopeError> {
    let text = std::fs::read_to_string(path)?;
    parse_script(&text)
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: usize,
    pub metrics: AdMetrics,
    pub alerts: Vec<PerformanceAlert>,
    pub latency: LatencyDistribution,
    pub summaries: Vec<SessionSummary>,
    pub transactions: Vec<TransactionRecord>,
    pub spans: Vec<SpanRecord>,
    pub events: Vec<CapturedEvent>,
    /// Traces still open when the script ended.
    pub active_transactions: usize,
    /// Callbacks that arrived after their ad was released.
    pub ignored_callbacks: usize,
}

pub struct Replayer {
    ads: AdInstrumentation,
    ads_config: AdsConfig,
    ingestor: SharedIngestor,
    labels: HashMap<String, String>,
    summaries: Vec<SessionSummary>,
    ignored_callbacks: usize,
}

impl Replayer {
    pub fn new(config: &AdScopeConfig) -> Self {
        Self::with_sinks(config, Vec::new())
    }

    /// Replayer whose records also reach `extra` sinks.
    pub fn with_sinks(config: &AdScopeConfig, extra: Vec<Arc<dyn TelemetrySink>>) -> Self {
        let (bus, receiver) = TelemetryBus::new_pair();
        let mut fanout = FanoutSink::new(vec![Arc::new(bus), Arc::new(LogSink)]);
        for sink in extra {
            fanout.push(sink);
        }
        let sink: Arc<dyn TelemetrySink> = Arc::new(fanout);

        let tracker = LifecycleTracker::with_config(sink.clone(), &config.tracking);
        let metrics = MetricsAggregator::with_config(sink, &config.tracking);
        Self {
            ads: AdInstrumentation::new(tracker, metrics),
            ads_config: config.ads.clone(),
            ingestor: SharedIngestor::new(EventIngestor::new(receiver)),
            labels: HashMap::new(),
            summaries: Vec::new(),
            ignored_callbacks: 0,
        }
    }

    /// Run every step in order. Must be called inside a tokio runtime with the
    /// time driver enabled so impression deadlines can fire.
    pub async fn run(mut self, script: Vec<ScriptLine>) -> Result<ReplayReport, AdScopeError> {
        let steps = script.len();
        for ScriptLine { line, step } in script {
            self.apply(line, step).await?;
            self.ingestor.drain();
        }
        // Let aborted or elapsed deadline tasks settle before collecting.
        tokio::task::yield_now().await;
        info!(steps, "replay finished");
        Ok(self.into_report(steps))
    }

    async fn apply(&mut self, line: usize, step: ScriptStep) -> Result<(), AdScopeError> {
        debug!(line, step = ?step, "replay step");
        match step {
            ScriptStep::StartSession => {
                self.ads.metrics_mut().start_session();
            }
            ScriptStep::EndSession => {
                let summary = self.ads.metrics_mut().end_session();
                self.summaries.push(summary);
            }
            ScriptStep::Begin {
                label,
                ad_type,
                ad_unit_id,
                placement,
            } => {
                let unit = ad_unit_id.unwrap_or_else(|| self.ads_config.unit_for(ad_type).to_string());
                let placement = placement
                    .as_deref()
                    .map(AdPlacement::from)
                    .unwrap_or_default();
                let transaction_id = self.ads.begin(ad_type, &unit, placement);
                self.labels.insert(label, transaction_id);
            }
            ScriptStep::Callback { label, callback } => {
                let Some(transaction_id) = self.labels.get(&label) else {
                    return Err(AdScopeError::ScriptError {
                        line,
                        message: format!("callback for unknown label '{}'", label),
                    });
                };
                if !self.ads.handle(transaction_id, callback) {
                    self.ignored_callbacks += 1;
                }
            }
            ScriptStep::Wait { seconds } => {
                tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
            }
            ScriptStep::Export => {
                self.ads.metrics().export_metrics();
            }
        }
        Ok(())
    }

    fn into_report(self, steps: usize) -> ReplayReport {
        let mut transactions = Vec::new();
        let mut spans = Vec::new();
        let mut events = Vec::new();
        for record in self.ingestor.take_records() {
            match record.payload {
                TelemetryPayload::Span(span) => spans.push(span),
                TelemetryPayload::Transaction(tx) => transactions.push(tx),
                TelemetryPayload::Event(event) => events.push(event),
            }
        }

        let aggregator = self.ads.metrics();
        let metrics = aggregator.metrics().clone();
        ReplayReport {
            steps,
            alerts: aggregator.alerts(),
            latency: LatencyDistribution::from_samples(&metrics.ad_latency_secs),
            metrics,
            summaries: self.summaries,
            transactions,
            spans,
            events,
            active_transactions: self.ads.tracker().active_count(),
            ignored_callbacks: self.ignored_callbacks,
        }
    }
}
