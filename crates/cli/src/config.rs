//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_AGENT_URL: &str = "http://localhost:8080";

/// Namespace for local translations when neither request nor CLI names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Agent endpoint URL
    pub agent_url: Option<String>,
    /// Namespace for local translations whose request names none
    pub default_namespace: Option<String>,
}

impl Config {
    /// Load configuration from the user config file
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs_next::config_dir().context("Could not determine config directory")?;
        Ok(dir.join("podbridge").join("config.json"))
    }

    /// Agent URL: explicit flag or env first, then the file, then the default
    pub fn agent_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.agent_url.clone())
            .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string())
    }

    pub fn namespace(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.default_namespace.clone())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }
}
