//! Configuration for fluxlist.
//!
//! Loaded from `.fluxlist.yml` or `~/.config/fluxlist/fluxlist.yml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ListError, Result};

/// Default number of items the remote returns per page.
pub const DEFAULT_NETWORK_PAGE_SIZE: usize = 20;

/// Default distance from the end of the list at which more items are loaded.
pub const DEFAULT_LOAD_MORE_OFFSET: usize = 10;

/// Default age after which a list needs a refresh (10 minutes).
pub const DEFAULT_STATE_EXPIRY_MS: u64 = 600_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter passed to env_logger when RUST_LOG is unset.
    pub log_level: Option<String>,

    /// Paging behaviour.
    pub lists: ListConfig,

    /// Persistence settings.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .fluxlist.yml in current directory
    /// 3. ~/.config/fluxlist/fluxlist.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_config = PathBuf::from(".fluxlist.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .fluxlist.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load .fluxlist.yml: {}", e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("fluxlist").join("fluxlist.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a YAML config file and validate it.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.lists.validate()
    }
}

/// Paging behaviour shared by every list in a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Items per remote page; a shorter page marks the end of the list.
    #[serde(rename = "network-page-size")]
    pub network_page_size: usize,

    /// How close to the end an item access triggers a load-more.
    #[serde(rename = "load-more-offset")]
    pub load_more_offset: usize,

    /// Age in milliseconds after which a list needs a refresh.
    #[serde(rename = "state-expiry-ms")]
    pub state_expiry_ms: u64,

    /// Capacity of the change notification channel.
    #[serde(rename = "event-capacity")]
    pub event_capacity: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            network_page_size: DEFAULT_NETWORK_PAGE_SIZE,
            load_more_offset: DEFAULT_LOAD_MORE_OFFSET,
            state_expiry_ms: DEFAULT_STATE_EXPIRY_MS,
            event_capacity: 256,
        }
    }
}

impl ListConfig {
    pub fn validate(&self) -> Result<()> {
        if self.network_page_size == 0 {
            return Err(ListError::Config("lists.network-page-size must be > 0".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(ListError::Config("lists.event-capacity must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Which storage backend holds list records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `lists.jsonl` when the JSONL backend is used.
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,

    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fluxlist"),
            backend: StorageBackend::Memory,
        }
    }
}
