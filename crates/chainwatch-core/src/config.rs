//! Application configuration and persistence utilities.
//!
//! Configuration is a single JSON file in the platform config directory:
//! - Timeouts and poll interval for chain I/O
//! - Balance cache capacity
//! - An optional custom chain catalog (empty means the built-in one)
//! - The last selected chain and tracked account

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::registry::ChainRegistry;
use crate::types::{Account, ChainInfo};

/// Configuration error type.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Other configuration error.
    #[error("{0}")]
    Other(String),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upper bound on opening a chain connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Upper bound on a single balance refresh.
    #[serde(default = "default_balance_timeout_secs")]
    pub balance_timeout_secs: u64,
    /// Interval between background balance refreshes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Maximum number of (chain, account) balances kept in memory.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Custom chain catalog. Empty means the built-in chains.
    #[serde(default)]
    pub chains: Vec<ChainInfo>,
    /// Endpoint of the last selected chain.
    #[serde(default)]
    pub last_chain: Option<String>,
    /// Last tracked account address.
    #[serde(default)]
    pub last_account: Option<String>,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_balance_timeout_secs() -> u64 {
    5
}

fn default_poll_interval_secs() -> u64 {
    12
}

fn default_cache_capacity() -> usize {
    64
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            balance_timeout_secs: default_balance_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            cache_capacity: default_cache_capacity(),
            chains: Vec::new(),
            last_chain: None,
            last_account: None,
        }
    }
}

impl AppConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn balance_timeout(&self) -> Duration {
        Duration::from_secs(self.balance_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Cache capacity, clamped to at least one entry.
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Build the chain catalog this configuration describes.
    pub fn registry(&self) -> ChainRegistry {
        if self.chains.is_empty() {
            ChainRegistry::builtin()
        } else {
            ChainRegistry::new(self.chains.clone())
        }
    }

    /// The last tracked account, if any.
    pub fn last_account(&self) -> Option<Account> {
        self.last_account.as_deref().map(Account::from)
    }
}

// ==================== Path Utilities ====================

/// Get the config directory.
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("xyz", "chainwatch", "chainwatch")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| ConfigError::Other("Could not determine config directory".to_string()))
}

/// Get the config file path.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    get_config_dir().map(|dir| dir.join("config.json"))
}

// ==================== Config I/O ====================

/// Load configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from a file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path()?)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Backup a corrupted config file for debugging.
pub fn backup_corrupted_config(path: &Path) -> Result<PathBuf, ConfigError> {
    let parent = path
        .parent()
        .ok_or_else(|| ConfigError::Other("Config path has no parent".to_string()))?;
    let backup_path = parent.join(format!(
        "config.backup.{}",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));
    fs::copy(path, &backup_path)?;
    Ok(backup_path)
}
