//! Shared test utilities for integration tests
//!
//! Configuration lookups read HOME, XDG_CONFIG_HOME, ADSCOPE_ENV and
//! ADSCOPE__* variables; tests that touch them run serialized here.

use std::sync::{Arc, Mutex};

use adscope::lifecycle::LifecycleTracker;
use adscope::metrics::MetricsAggregator;
use adscope::telemetry::MemorySink;
use tempfile::TempDir;

static CONFIG_ENV_MUTEX: Mutex<()> = Mutex::new(());

const ISOLATED_VARS: [&str; 3] = ["HOME", "XDG_CONFIG_HOME", "ADSCOPE_ENV"];

struct EnvState {
    saved: Vec<(String, Option<String>)>,
}

impl EnvState {
    fn capture() -> Self {
        let mut saved: Vec<(String, Option<String>)> = ISOLATED_VARS
            .iter()
            .map(|name| (name.to_string(), std::env::var(name).ok()))
            .collect();
        for (name, value) in std::env::vars() {
            if name.starts_with("ADSCOPE__") {
                saved.push((name, Some(value)));
            }
        }
        Self { saved }
    }

    fn restore(self) {
        let stray: Vec<String> = std::env::vars()
            .map(|(name, _)| name)
            .filter(|name| name.starts_with("ADSCOPE__"))
            .collect();
        for name in stray {
            std::env::remove_var(name);
        }
        for (name, value) in self.saved {
            match value {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointed into `test_dir` and every
/// ADSCOPE__* override cleared. The environment is restored afterwards.
pub fn with_config_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let home = test_dir.path().join("home");
    let xdg = test_dir.path().join("xdg");
    std::fs::create_dir_all(&home).unwrap();
    std::fs::create_dir_all(&xdg).unwrap();

    for (name, _) in &env_state.saved {
        if name.starts_with("ADSCOPE__") {
            std::env::remove_var(name);
        }
    }
    std::env::remove_var("ADSCOPE_ENV");
    std::env::set_var("HOME", &home);
    std::env::set_var("XDG_CONFIG_HOME", &xdg);

    let result = f();

    env_state.restore();
    result
}

pub fn tracker() -> (LifecycleTracker, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (LifecycleTracker::new(sink.clone()), sink)
}

pub fn aggregator() -> (MetricsAggregator, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (MetricsAggregator::new(sink.clone()), sink)
}
