//! Integration tests for script replay and the CLI route table

use std::path::PathBuf;
use std::sync::Arc;

use adscope::cli::{load_script, parse_script, Commands, OutputFormat, Replayer, RunContext};
use adscope::config::AdScopeConfig;
use adscope::error::AdScopeError;
use adscope::telemetry::{
    AdEvent, AdType, FinishReason, MemorySink, TelemetrySink, TerminationCause,
};
use tempfile::TempDir;

use super::test_utils::with_config_env;

fn sample_script() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scripts")
        .join("session.jsonl")
}

#[tokio::test(start_paused = true)]
async fn sample_session_replays_to_expected_report() {
    let script = load_script(&sample_script()).unwrap();
    let memory = Arc::new(MemorySink::new());
    let extra: Vec<Arc<dyn TelemetrySink>> = vec![memory.clone()];
    let report = Replayer::with_sinks(&AdScopeConfig::default(), extra)
        .run(script)
        .await
        .unwrap();

    let m = &report.metrics;
    assert_eq!(m.ad_request_count, 5);
    assert_eq!(m.ad_load_success_count, 4);
    assert_eq!(m.ad_load_failure_count, 1);
    assert_eq!(m.fill_rate, 80.0);
    assert_eq!(m.impression_count, 3);
    assert_eq!(m.click_count, 1);
    assert!((m.click_through_rate - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(m.rewarded_video_completions, 1);

    assert_eq!(report.latency.total(), 5);
    assert_eq!(report.latency.from_1s_to_2s, 1);
    assert_eq!(report.latency.under_1s, 4);

    let causes: Vec<(AdType, TerminationCause)> = report
        .transactions
        .iter()
        .map(|tx| (tx.ad_type, tx.cause))
        .collect();
    assert_eq!(
        causes,
        vec![
            (AdType::Banner, TerminationCause::TerminalEvent(AdEvent::LoadSuccess)),
            (
                AdType::Interstitial,
                TerminationCause::TerminalEvent(AdEvent::ShowSuccess)
            ),
            (AdType::Interstitial, TerminationCause::TerminalEvent(AdEvent::Dismiss)),
            (AdType::Rewarded, TerminationCause::Explicit),
            (
                AdType::Rewarded,
                TerminationCause::TerminalEvent(AdEvent::VideoComplete)
            ),
        ]
    );
    assert_eq!(report.active_transactions, 0);
    assert_eq!(report.summaries.len(), 1);
    assert_eq!(report.summaries[0].total_impressions, 3);
    assert!(report.alerts.is_empty());

    let reasons: Vec<Option<FinishReason>> = report
        .spans
        .iter()
        .filter(|s| s.op == AdEvent::WaitingForImpression)
        .map(|s| s.finish_reason)
        .collect();
    assert_eq!(
        reasons,
        vec![
            Some(FinishReason::ImpressionReceived),
            Some(FinishReason::Timeout),
            Some(FinishReason::ImpressionReceived),
        ]
    );

    // The extra sink sees the same stream as the bus.
    assert_eq!(memory.transactions().len(), report.transactions.len());
    assert_eq!(memory.events().len(), report.events.len());
}

#[tokio::test(start_paused = true)]
async fn callbacks_after_release_are_counted() {
    let script = parse_script(
        r#"{"step":"begin","label":"a","ad_type":"interstitial"}
{"step":"callback","label":"a","callback":"dismissed"}
{"step":"callback","label":"a","callback":"click"}
{"step":"begin","label":"b","ad_type":"rewarded","ad_unit_id":"custom-unit"}"#,
    )
    .unwrap();
    let report = Replayer::new(&AdScopeConfig::default())
        .run(script)
        .await
        .unwrap();
    assert_eq!(report.ignored_callbacks, 1);
    assert_eq!(report.active_transactions, 1);
    assert_eq!(report.metrics.click_count, 0);
    assert!(report
        .spans
        .iter()
        .any(|s| s.attributes.ad_unit_id == "custom-unit"));
}

#[test]
fn run_context_replays_script_as_json() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(
        workspace.join("short.jsonl"),
        "{\"step\":\"start_session\"}\n{\"step\":\"begin\",\"label\":\"a\",\"ad_type\":\"banner\"}\n{\"step\":\"callback\",\"label\":\"a\",\"callback\":\"loaded\"}\n{\"step\":\"end_session\"}\n",
    )
    .unwrap();

    with_config_env(&temp, || {
        let context = RunContext::new(workspace.clone(), None).unwrap();
        let output = context
            .execute(&Commands::Replay {
                script: PathBuf::from("short.jsonl"),
                format: OutputFormat::Json,
            })
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["metrics"]["ad_request_count"], 1);
        assert_eq!(json["metrics"]["fill_rate"], 100.0);
        assert_eq!(json["transactions"].as_array().unwrap().len(), 1);

        let text = context
            .execute(&Commands::Replay {
                script: PathBuf::from("short.jsonl"),
                format: OutputFormat::Text,
            })
            .unwrap();
        assert!(text.contains("Fill rate"));
        assert!(text.contains("load_success"));
    });
}

#[test]
fn run_context_reports_bad_script_line() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(workspace.join("bad.jsonl"), "{\"step\":\"start_session\"}\nnot json\n").unwrap();

    with_config_env(&temp, || {
        let context = RunContext::new(workspace.clone(), None).unwrap();
        let err = context
            .execute(&Commands::Replay {
                script: PathBuf::from("bad.jsonl"),
                format: OutputFormat::Text,
            })
            .unwrap_err();
        assert!(matches!(err, AdScopeError::ScriptError { line: 2, .. }));
    });
}

#[test]
fn run_context_rejects_invalid_config() {
    let temp = TempDir::new().unwrap();
    let config_file = temp.path().join("adscope.toml");
    std::fs::write(&config_file, "[tracking]\nimpression_timeout_secs = 0\n").unwrap();
    let result = RunContext::new(temp.path().to_path_buf(), Some(config_file));
    assert!(matches!(result, Err(AdScopeError::InvalidConfig(_))));
}

#[test]
fn config_command_shows_placeholder_dsn() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();

    with_config_env(&temp, || {
        let context = RunContext::new(workspace.clone(), None).unwrap();
        let output = context
            .execute(&Commands::Config {
                format: OutputFormat::Json,
            })
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["dsn"]["source"]["source"], "placeholder");
        assert_eq!(json["config"]["tracking"]["impression_timeout_secs"], 10);
    });
}
