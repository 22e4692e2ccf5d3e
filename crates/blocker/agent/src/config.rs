use blocker_engine::EngineSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "BLOCKER_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub monitoring: EngineSettings,
    pub enforcement: EnforcementConfig,
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding both blocklists; shared by the daemon and the CLI.
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    /// Post a desktop notification for every block.
    pub notify: bool,
    /// SIGKILL every process of a blocked app.
    pub kill_apps: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub socket_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("blocker")
                .join("blocklist.db"),
        }
    }
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            notify: true,
            kill_apps: false,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            socket_path: std::env::temp_dir().join("blocker.sock"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config, falling back to defaults when it is missing or broken.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!(path = %Self::config_path().display(), "configuration loaded");
                config
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load config, using defaults");
                Self::default()
            }
        }
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("blocker")
            .join("config.toml")
    }
}
