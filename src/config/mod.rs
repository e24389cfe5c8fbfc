// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration for the distributed backend.
//!
//! Loaded from YAML, with defaults for everything except the consumer name.
//! Wiring this into a CLI is left to embedding applications.

pub mod consts;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config::consts::{
    DEFAULT_BATCH_SIZE, DEFAULT_BLOCK_TIMEOUT_MS, DEFAULT_GROUP, DEFAULT_POOL_SIZE, DEFAULT_URL,
    MAX_POOL_SIZE, MIN_POOL_SIZE,
};

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration for a distributed connector backend.
///
/// # Example
/// ```yaml
/// url: "redis://127.0.0.1:6379"
/// consumer: "worker-1"
/// group: "taskwire"
/// pool_size: 8
/// block_timeout_ms: 2000
/// batch_size: 8
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DistributedConfig {
    /// Broker connection URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Consumer identity within the group. Reusing an identity after a crash
    /// is what enables backlog recovery.
    pub consumer: String,

    /// Consumer group name shared by competing providers.
    #[serde(default = "default_group")]
    pub group: String,

    /// Upper bound on concurrently held blocking connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Blocking poll timeout; timed-out polls retry.
    #[serde(default = "default_block_timeout_ms")]
    pub block_timeout_ms: u64,

    /// Maximum entries fetched per consumer-group read.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_block_timeout_ms() -> u64 {
    DEFAULT_BLOCK_TIMEOUT_MS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl DistributedConfig {
    /// Configuration with defaults for everything but the consumer identity.
    pub fn new(consumer: impl Into<String>) -> Self {
        Self {
            url: default_url(),
            consumer: consumer.into(),
            group: default_group(),
            pool_size: default_pool_size(),
            block_timeout_ms: default_block_timeout_ms(),
            batch_size: default_batch_size(),
        }
    }

    pub fn block_timeout(&self) -> Duration {
        Duration::from_millis(self.block_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consumer.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "consumer must not be empty".to_string(),
            });
        }
        if !(MIN_POOL_SIZE..=MAX_POOL_SIZE).contains(&self.pool_size) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "pool_size {} outside supported range {}..={}",
                    self.pool_size, MIN_POOL_SIZE, MAX_POOL_SIZE
                ),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                message: "batch_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Load and validate a [`DistributedConfig`] from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<DistributedConfig, ConfigError> {
    let raw = fs::read_to_string(path)?;
    let config: DistributedConfig = serde_yaml::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: DistributedConfig = serde_yaml::from_str("consumer: worker-1\n").unwrap();
        assert_eq!(config.consumer, "worker-1");
        assert_eq!(config.group, DEFAULT_GROUP);
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.block_timeout(), Duration::from_millis(DEFAULT_BLOCK_TIMEOUT_MS));
        config.validate().unwrap();
    }

    #[test]
    fn empty_consumer_is_rejected() {
        let config = DistributedConfig::new("  ");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn pool_bounds_are_enforced() {
        let mut config = DistributedConfig::new("worker-1");
        config.pool_size = 0;
        assert!(config.validate().is_err());
        config.pool_size = MAX_POOL_SIZE + 1;
        assert!(config.validate().is_err());
    }
}
