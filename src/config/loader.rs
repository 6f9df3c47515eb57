//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (`<config dir>/lakedown/config.toml`)
//! 3. Project config (`./lakedown.toml`)
//! 4. Explicit config file (`--config`)
//! 5. Environment variables (`LAKEDOWN_` prefix, `__` between sections)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::types::{LakeError, Result};

/// Environment variable prefix (e.g. `LAKEDOWN_IMAGES__CONCURRENCY` -> `images.concurrency`)
pub const ENV_PREFIX: &str = "LAKEDOWN_";

/// Project config file name, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "lakedown.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → explicit file → env vars
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(LakeError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| LakeError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lakedown").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get path to the project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    /// Render the effective configuration as TOML
    pub fn render(config: &Config) -> Result<String> {
        toml::to_string_pretty(config).map_err(|e| LakeError::Config(e.to_string()))
    }
}
