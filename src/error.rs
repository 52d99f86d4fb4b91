//! Error types for adscope.
//!
//! Tracking operations never fail toward the caller; these errors only surface
//! from configuration loading, logging setup, and the replay CLI.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdScopeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration:\n{0}")]
    InvalidConfig(String),

    #[error("Properties parse error in {path:?} at line {line}: {message}")]
    PropertiesError {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Replay script error at line {line}: {message}")]
    ScriptError { line: usize, message: String },

    #[error("Telemetry sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for AdScopeError {
    fn from(err: config::ConfigError) -> Self {
        AdScopeError::ConfigError(err.to_string())
    }
}
