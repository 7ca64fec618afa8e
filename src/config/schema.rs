//! Configuration schema for bitrise-cache
//!
//! Configuration is stored at `~/.config/bitrise-cache/config.toml`. Every
//! section is optional; missing values fall back to the defaults below.

use crate::key::KeyScope;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Restore phase settings
    pub restore: RestoreConfig,

    /// Save phase settings
    pub save: SaveConfig,

    /// Key scoping
    pub keys: KeysConfig,

    /// Local storage settings
    pub storage: StorageConfig,
}

/// Restore phase settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Extra attempts after a transient provider failure
    pub retries: u32,

    /// Base delay between attempts, multiplied by the attempt number
    pub retry_delay_ms: u64,

    /// Step identifier reported to the provider
    pub step_id: String,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 1000,
            step_id: "github-cache-restore".to_string(),
        }
    }
}

/// Save phase settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// zstd compression level for new archives
    pub compression_level: i32,

    /// Keep an existing entry instead of replacing it
    pub is_key_unique: bool,

    /// Step identifier reported to the provider
    pub step_id: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
            is_key_unique: false,
            step_id: "github-cache-save".to_string(),
        }
    }
}

/// Key scoping settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// How keys are prefixed with the repository identity
    pub scope: KeyScope,
}

/// Local storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Cache directory (defaults to the platform cache dir)
    pub dir: Option<PathBuf>,
}
