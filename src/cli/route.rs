//! CLI route: single route table and run context. Dispatches to replay and presentation.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_config_json, format_config_text, format_replay_json, format_replay_text,
};
use crate::cli::replay::{load_script, Replayer};
use crate::config::{resolve_dsn, AdScopeConfig, ConfigLoader, ResolvedDsn};
use crate::error::AdScopeError;

/// Runtime context for CLI execution: workspace, loaded config and telemetry DSN.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: AdScopeConfig,
    dsn: ResolvedDsn,
}

impl RunContext {
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, AdScopeError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        config.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            AdScopeError::InvalidConfig(msgs.join("\n"))
        })?;

        let dsn = resolve_dsn(&workspace_root, &config);
        if dsn.is_placeholder() {
            warn!("telemetry DSN not configured; records stay local");
        } else {
            info!(source = %dsn.source, environment = %config.telemetry.environment, "telemetry DSN resolved");
        }

        Ok(Self {
            workspace_root,
            config,
            dsn,
        })
    }

    pub fn config(&self) -> &AdScopeConfig {
        &self.config
    }

    pub fn dsn(&self) -> &ResolvedDsn {
        &self.dsn
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, AdScopeError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command.name(),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, AdScopeError> {
        match command {
            Commands::Replay { script, format } => {
                let path = if script.is_absolute() {
                    script.clone()
                } else {
                    self.workspace_root.join(script)
                };
                let steps = load_script(&path)?;
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()?;
                let report = runtime.block_on(Replayer::new(&self.config).run(steps))?;
                match format {
                    OutputFormat::Json => format_replay_json(&report),
                    OutputFormat::Text => Ok(format_replay_text(&report)),
                }
            }
            Commands::Config { format } => match format {
                OutputFormat::Json => format_config_json(&self.config, &self.dsn),
                OutputFormat::Text => Ok(format_config_text(&self.config, &self.dsn)),
            },
        }
    }
}
