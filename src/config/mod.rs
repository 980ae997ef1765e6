//! Node configuration
//!
//! A TOML file with `[peers]`, `[log]`, `[persistence]` and `[mining]`
//! tables. Every field has a default, so a missing file or an empty table
//! yields a runnable single-node setup. A couple of env vars override the
//! file for containerized deployments.

use crate::error::Result;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CHAIN_PATH_ENV: &str = "FERROCOIN_CHAIN_PATH";
pub const LOG_LEVEL_ENV: &str = "FERROCOIN_LOG_LEVEL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub peers: PeersConfig,
    pub log: LogConfig,
    pub persistence: PersistenceConfig,
    pub mining: MiningConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PeersConfig {
    /// host:port of every known peer.
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub chain_path: PathBuf,
    pub interval_millis: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            chain_path: PathBuf::from("chain.json"),
            interval_millis: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub enabled: bool,
    /// Minimum milliseconds since the previous block before a mined block
    /// is acceptable.
    pub time_cap_millis: i64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            enabled: true,
            time_cap_millis: 0,
        }
    }
}

impl Config {
    /// Load from a TOML file; a missing file falls back to defaults.
    /// Env overrides are applied last.
    pub fn load(path: &Path) -> Result<Config> {
        let mut config = if path.exists() {
            let data = fs::read_to_string(path)?;
            toml::from_str(&data)?
        } else {
            Config::default()
        };

        if let Ok(chain_path) = env::var(CHAIN_PATH_ENV) {
            config.persistence.chain_path = PathBuf::from(chain_path);
        }
        if let Ok(level) = env::var(LOG_LEVEL_ENV) {
            config.log.level = level;
        }
        Ok(config)
    }
}
