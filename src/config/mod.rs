//! Configuration module for blockflow
//!
//! This module handles configuration loading and saving:
//! - Default block options applied to every block
//! - Per-block overrides keyed by block name
//! - Link defaults and scenario settings
//!
//! # Config Location
//!
//! The default config file lives in the platform-appropriate config
//! directory under `dev.hxyulin.blockflow`:
//!
//! - **Linux**: `~/.config/dev.hxyulin.blockflow/blockflow.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.blockflow/blockflow.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.blockflow\blockflow.toml`
//!
//! # Example
//!
//! ```toml
//! [defaults]
//! parallelism = 1
//!
//! [blocks.square]
//! parallelism = 4
//! bounded_capacity = 16
//!
//! [links]
//! propagate_completion = true
//!
//! [scenarios]
//! work_delay_ms = 250
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{DataflowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.blockflow";

/// Config filename
pub const CONFIG_FILE: &str = "blockflow.toml";

/// Current config format version
pub const CONFIG_VERSION: u32 = 1;

/// Get the default config file path
pub fn default_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataflowConfig {
    /// Version for future migration support
    #[serde(default = "default_config_version")]
    pub version: u32,

    /// Options applied to blocks without an override
    #[serde(default)]
    pub defaults: BlockOptions,

    /// Per-block overrides keyed by block name
    #[serde(default)]
    pub blocks: HashMap<String, BlockOptions>,

    /// Link defaults
    #[serde(default)]
    pub links: LinkDefaults,

    /// Scenario settings
    #[serde(default)]
    pub scenarios: ScenarioSettings,
}

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

impl Default for DataflowConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            defaults: BlockOptions::default(),
            blocks: HashMap::new(),
            links: LinkDefaults::default(),
            scenarios: ScenarioSettings::default(),
        }
    }
}

impl DataflowConfig {
    /// Options for the block called `name`: its override if present,
    /// otherwise the defaults. The name is always set.
    pub fn block_options(&self, name: &str) -> BlockOptions {
        self.blocks
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
            .named(name)
    }

    /// Add or replace a per-block override.
    pub fn set_block_options(&mut self, name: impl Into<String>, options: BlockOptions) {
        self.blocks.insert(name.into(), options);
    }

    /// Check every options entry.
    pub fn validate(&self) -> Result<()> {
        self.defaults.validate()?;
        for (name, options) in &self.blocks {
            options.validate().map_err(|e| {
                DataflowError::Config(format!("Invalid options for block '{}': {}", name, e))
            })?;
        }
        Ok(())
    }

    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DataflowError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DataflowError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Load config from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataflowError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load config, returning defaults if the file is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to a file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml_string()?;
        std::fs::write(path, content)
            .map_err(|e| DataflowError::Config(format!("Failed to write config: {}", e)))
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DataflowConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.defaults.parallelism, 1);
        assert!(config.blocks.is_empty());
        assert!(config.links.propagate_completion);
    }

    #[test]
    fn test_block_options_override() {
        let mut config = DataflowConfig::default();
        config.set_block_options("square", BlockOptions::new().with_parallelism(4));

        let square = config.block_options("square");
        assert_eq!(square.parallelism, 4);
        assert_eq!(square.name.as_deref(), Some("square"));

        let other = config.block_options("printer");
        assert_eq!(other.parallelism, 1);
        assert_eq!(other.name.as_deref(), Some("printer"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = DataflowConfig::from_toml_str(
            r#"
            [blocks.throttled]
            bounded_capacity = 2

            [scenarios]
            work_delay_ms = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.blocks["throttled"].bounded_capacity, Some(2));
        assert_eq!(config.blocks["throttled"].parallelism, 1);
        assert_eq!(config.scenarios.work_delay_ms, 5);
        assert_eq!(config.scenarios.throttle_capacity, 2);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = DataflowConfig::from_toml_str("[blocks.bad]\nparallelism = 0\n").unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = DataflowConfig::default();
        config.set_block_options("square", BlockOptions::new().with_bounded_capacity(16));
        config.scenarios.default_input = Some("1,2,3".to_string());
        config.save(&path).unwrap();

        let loaded = DataflowConfig::load(&path).unwrap();
        assert_eq!(loaded.blocks["square"].bounded_capacity, Some(16));
        assert_eq!(loaded.scenarios.default_input.as_deref(), Some("1,2,3"));
    }

    #[test]
    fn test_load_or_default_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "this is = = not toml").unwrap();
        let config = DataflowConfig::load_or_default(&path);
        assert!(config.blocks.is_empty());

        let missing = DataflowConfig::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(missing.version, CONFIG_VERSION);
    }
}
