//! Telemetry DSN resolution from `key=value` properties files.
//!
//! Search order: configured `telemetry.dsn`, then `sentry.properties` in the
//! workspace root, the workspace `config/` directory and the global adscope
//! directory. When nothing yields a value the placeholder is returned.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::sources::global_file::global_config_dir;
use crate::config::AdScopeConfig;
use crate::error::AdScopeError;

pub const PROPERTIES_FILE_NAME: &str = "sentry.properties";
pub const PLACEHOLDER_DSN: &str = "YOUR_SENTRY_DSN_HERE";
const DSN_KEYS: [&str; 2] = ["dsn", "defaults.dsn"];

/// Parse properties text. `#` and `!` start comments, the first `=` splits key
/// from value, and both sides are trimmed. Later keys override earlier ones.
pub fn parse_properties(text: &str, path: &Path) -> Result<BTreeMap<String, String>, AdScopeError> {
    let mut map = BTreeMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(AdScopeError::PropertiesError {
                path: path.to_path_buf(),
                line: index + 1,
                message: format!("expected key=value, got '{}'", line),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(AdScopeError::PropertiesError {
                path: path.to_path_buf(),
                line: index + 1,
                message: "empty key".to_string(),
            });
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    Ok(map)
}

pub fn read_properties(path: &Path) -> Result<BTreeMap<String, String>, AdScopeError> {
    let text = std::fs::read_to_string(path)?;
    parse_properties(&text, path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "path", rename_all = "snake_case")]
pub enum DsnSource {
    Config,
    PropertiesFile(PathBuf),
    Placeholder,
}

impl fmt::Display for DsnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DsnSource::Config => f.write_str("configuration"),
            DsnSource::PropertiesFile(path) => write!(f, "{}", path.display()),
            DsnSource::Placeholder => f.write_str("placeholder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDsn {
    pub dsn: String,
    pub source: DsnSource,
}

impl ResolvedDsn {
    pub fn is_placeholder(&self) -> bool {
        self.source == DsnSource::Placeholder
    }
}

/// Properties files searched in order.
pub fn candidate_paths(workspace_root: &Path) -> Vec<PathBuf> {
    let mut paths = vec![
        workspace_root.join(PROPERTIES_FILE_NAME),
        workspace_root.join("config").join(PROPERTIES_FILE_NAME),
    ];
    if let Some(dir) = global_config_dir() {
        paths.push(dir.join(PROPERTIES_FILE_NAME));
    }
    paths
}

fn dsn_from(map: &BTreeMap<String, String>) -> Option<String> {
    DSN_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_empty())
        .cloned()
}

/// Resolve the telemetry DSN. Unreadable or malformed files are skipped with a
/// warning; resolution itself never fails.
pub fn resolve_dsn(workspace_root: &Path, config: &AdScopeConfig) -> ResolvedDsn {
    if let Some(dsn) = config.telemetry.dsn.as_deref().filter(|d| !d.trim().is_empty()) {
        return ResolvedDsn {
            dsn: dsn.trim().to_string(),
            source: DsnSource::Config,
        };
    }

    for path in candidate_paths(workspace_root) {
        if !path.is_file() {
            continue;
        }
        match read_properties(&path) {
            Ok(map) => {
                if let Some(dsn) = dsn_from(&map) {
                    debug!(path = %path.display(), "telemetry dsn resolved from properties file");
                    return ResolvedDsn {
                        dsn,
                        source: DsnSource::PropertiesFile(path),
                    };
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable properties file");
            }
        }
    }

    warn!("no telemetry dsn configured; using placeholder");
    ResolvedDsn {
        dsn: PLACEHOLDER_DSN.to_string(),
        source: DsnSource::Placeholder,
    }
}
