//! CLI presentation: text and json formatters for replay reports and config.

use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::cli::replay::ReplayReport;
use crate::config::{AdScopeConfig, ResolvedDsn};
use crate::error::AdScopeError;
use crate::telemetry::TerminationCause;

fn to_json<T: Serialize>(value: &T) -> Result<String, AdScopeError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AdScopeError::ConfigError(format!("failed to render json: {}", e)))
}

pub fn format_replay_json(report: &ReplayReport) -> Result<String, AdScopeError> {
    to_json(report)
}

pub fn format_replay_text(report: &ReplayReport) -> String {
    let m = &report.metrics;
    let mut output = format!("Replayed {} step(s)\n\n", report.steps);

    let mut metrics = Table::new();
    metrics.load_preset(UTF8_FULL);
    metrics.set_header(vec!["Metric", "Value"]);
    metrics.add_row(vec!["Requests".to_string(), m.ad_request_count.to_string()]);
    metrics.add_row(vec!["Loads succeeded".to_string(), m.ad_load_success_count.to_string()]);
    metrics.add_row(vec!["Loads failed".to_string(), m.ad_load_failure_count.to_string()]);
    metrics.add_row(vec!["Fill rate".to_string(), format!("{:.1}%", m.fill_rate)]);
    metrics.add_row(vec!["Impressions".to_string(), m.impression_count.to_string()]);
    metrics.add_row(vec!["Clicks".to_string(), m.click_count.to_string()]);
    metrics.add_row(vec!["CTR".to_string(), format!("{:.2}%", m.click_through_rate)]);
    metrics.add_row(vec![
        "Rewarded completion".to_string(),
        format!("{:.1}%", m.rewarded_video_completion_rate),
    ]);
    metrics.add_row(vec![
        "Average latency".to_string(),
        format!("{:.2}s", m.average_latency_secs()),
    ]);
    metrics.add_row(vec![
        "Ads this session".to_string(),
        m.ad_frequency_per_session.to_string(),
    ]);
    output.push_str(&metrics.to_string());
    output.push_str("\n\n");

    if report.latency.total() > 0 {
        let mut latency = Table::new();
        latency.load_preset(UTF8_FULL);
        latency.set_header(vec!["Load latency", "Count"]);
        for (label, count) in report.latency.buckets() {
            latency.add_row(vec![label.to_string(), count.to_string()]);
        }
        output.push_str(&latency.to_string());
        output.push_str("\n\n");
    }

    if report.transactions.is_empty() {
        output.push_str("No lifecycle traces closed.\n");
    } else {
        let mut traces = Table::new();
        traces.load_preset(UTF8_FULL);
        traces.set_header(vec!["Transaction", "Type", "Closed by", "Spans", "Duration"]);
        for tx in &report.transactions {
            let cause = match tx.cause {
                TerminationCause::TerminalEvent(event) => event.as_str().to_string(),
                TerminationCause::Explicit => "finish".to_string(),
            };
            let duration_ms = (tx.ended_at - tx.started_at).num_milliseconds();
            traces.add_row(vec![
                tx.transaction_id.clone(),
                tx.ad_type.as_str().to_string(),
                cause,
                tx.spans.len().to_string(),
                format!("{}ms", duration_ms),
            ]);
        }
        output.push_str(&traces.to_string());
        output.push('\n');
    }

    if report.active_transactions > 0 {
        output.push_str(&format!(
            "{} trace(s) still open at end of script\n",
            report.active_transactions
        ));
    }
    if report.ignored_callbacks > 0 {
        output.push_str(&format!(
            "{} callback(s) ignored for released ads\n",
            report.ignored_callbacks
        ));
    }

    if report.alerts.is_empty() {
        output.push_str("\nNo performance alerts.\n");
    } else {
        output.push_str("\nAlerts:\n");
        for alert in &report.alerts {
            output.push_str(&format!("  [{}] {}\n", alert.severity.as_str(), alert.message));
        }
    }
    output
}

pub fn format_config_text(config: &AdScopeConfig, dsn: &ResolvedDsn) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Setting", "Value"]);
    let alerts = &config.tracking.alerts;
    let rows = [
        ("ads.app_id", config.ads.app_id.clone()),
        ("ads.banner_unit_id", config.ads.banner_unit_id.clone()),
        ("ads.interstitial_unit_id", config.ads.interstitial_unit_id.clone()),
        ("ads.rewarded_unit_id", config.ads.rewarded_unit_id.clone()),
        (
            "tracking.impression_timeout_secs",
            config.tracking.impression_timeout_secs.to_string(),
        ),
        ("tracking.alerts.min_fill_rate", alerts.min_fill_rate.to_string()),
        (
            "tracking.alerts.max_average_latency_secs",
            alerts.max_average_latency_secs.to_string(),
        ),
        (
            "tracking.alerts.min_click_through_rate",
            alerts.min_click_through_rate.to_string(),
        ),
        (
            "tracking.alerts.max_ad_frequency_per_session",
            alerts.max_ad_frequency_per_session.to_string(),
        ),
        ("telemetry.environment", config.telemetry.environment.clone()),
        ("telemetry.dsn", dsn.dsn.clone()),
        ("telemetry.dsn source", dsn.source.to_string()),
        ("logging.level", config.logging.level.clone()),
    ];
    for (key, value) in rows {
        table.add_row(vec![key.to_string(), value]);
    }
    let mut output = table.to_string();
    if dsn.is_placeholder() {
        output.push_str("\n\nNo telemetry DSN found; set telemetry.dsn or add sentry.properties.");
    }
    output
}

#[derive(Serialize)]
struct ConfigView<'a> {
    config: &'a AdScopeConfig,
    dsn: &'a ResolvedDsn,
}

pub fn format_config_json(config: &AdScopeConfig, dsn: &ResolvedDsn) -> Result<String, AdScopeError> {
    to_json(&ConfigView { config, dsn })
}
