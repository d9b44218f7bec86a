//! Configuration module for dataflow-rs
//!
//! A run is described by one [`RunConfig`]: which mode to run and the
//! settings for each mode. Configs are read from JSON or TOML, chosen by the
//! file extension.
//!
//! # Config Location
//!
//! Without an explicit path, the config is looked up in the per-user config
//! directory:
//! - **Linux**: `~/.config/dataflow-rs/dataflow.toml`
//! - **macOS**: `~/Library/Application Support/dataflow-rs/dataflow.toml`
//! - **Windows**: `%APPDATA%\dataflow-rs\dataflow.toml`
//!
//! # Example
//!
//! ```ignore
//! use dataflow_rs::config::RunConfig;
//!
//! let config = RunConfig::load_or_default(None);
//! config.validate()?;
//! config.save("run.json")?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{DataflowError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dataflow-rs";

/// Default config filename
pub const CONFIG_FILE: &str = "dataflow.toml";

/// Get the per-user config directory
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Everything a run needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RunMode,
    pub stats: StatsSettings,
    pub generate: GenerateSettings,
    pub walk: WalkSettings,
    pub log: LogSettings,
}

impl RunConfig {
    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataflowError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match ConfigFormat::of(path) {
            ConfigFormat::Toml => toml::from_str(&content)
                .map_err(|e| DataflowError::Config(format!("Failed to parse config: {}", e))),
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| DataflowError::Config(format!("Failed to parse config: {}", e))),
        }
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults; any other failure is logged and
    /// also yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Self::default(),
            },
        };

        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save as pretty JSON or TOML, by extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::of(path) {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| DataflowError::Serialization(e.to_string()))?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content).map_err(|e| {
            DataflowError::Config(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    /// Reject settings no pipeline can run with
    pub fn validate(&self) -> Result<()> {
        if self.stats.report_period_ms == Some(0) {
            return Err(DataflowError::Config(
                "stats.report_period_ms must be positive".to_string(),
            ));
        }
        if self.stats.print_every == 0 {
            return Err(DataflowError::Config(
                "stats.print_every must be at least 1".to_string(),
            ));
        }
        self.generate
            .distribution
            .validate()
            .map_err(|e| DataflowError::from(e).with_context("generate.distribution"))?;
        if !self.walk.variance.is_finite() || !self.walk.mean.is_finite() {
            return Err(DataflowError::Config(
                "walk.mean and walk.variance must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
