//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::AdScopeError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &AdScopeError) -> String {
    match e {
        AdScopeError::ScriptError { .. } => format!("{}\n\nSee scripts/session.jsonl for the step format.", e),
        _ => e.to_string(),
    }
}
