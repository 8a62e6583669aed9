use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interface to account, or "All" for the sum of every interface.
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_api_addr")]
    pub api_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log to rolling files under this directory instead of the console.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_interface() -> String {
    "All".to_string()
}

fn default_database_path() -> String {
    "data/usage_history.db".to_string()
}

fn default_api_addr() -> String {
    "127.0.0.1:8700".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            database_path: default_database_path(),
            api_addr: default_api_addr(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}
