//! CLI parse: clap types for adscope. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// adscope - ad lifecycle tracing and session metrics
#[derive(Parser)]
#[command(name = "adscope")]
#[command(about = "Replay ad SDK callbacks through lifecycle tracing and session metrics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".", global = true)]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false", global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a JSON-lines script of SDK callbacks and report the result
    Replay {
        /// Script path, one step per line
        script: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the effective configuration and resolved telemetry DSN
    Config {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Replay { .. } => "replay",
            Commands::Config { .. } => "config",
        }
    }
}
