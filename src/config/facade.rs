//! Loader entry points. Orchestrates sources and merge; callers see only `AdScopeConfig`.

use std::path::{Path, PathBuf};

use config::File;
use tracing::debug;

use crate::config::merge::builder_with_defaults;
use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::AdScopeConfig;
use crate::error::AdScopeError;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest first: built-in defaults, the global file, the
    /// workspace `config/config.toml`, `config/{ADSCOPE_ENV}.toml`, then
    /// `ADSCOPE__SECTION__KEY` environment variables.
    pub fn load(workspace_root: &Path) -> Result<AdScopeConfig, AdScopeError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: AdScopeConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "configuration loaded");
        Ok(config)
    }

    /// Load configuration from a single file, on top of the defaults only.
    pub fn load_from_file(path: &Path) -> Result<AdScopeConfig, AdScopeError> {
        if !path.exists() {
            return Err(AdScopeError::ConfigError(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
        let config = builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Global config file path, when a home directory is known.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    pub fn default() -> AdScopeConfig {
        AdScopeConfig::default()
    }
}
