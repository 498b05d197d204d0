//! Configuration management for the scheduler.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file path.
    pub path: PathBuf,
    /// How long a writer waits on a lock before failing with a
    /// retryable storage error.
    pub busy_timeout_ms: u64,
    /// Bounded retry budget for busy/locked write transactions.
    pub max_write_retries: u32,
}

impl SchedulerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig {
                path: PathBuf::from("vaxsched.db"),
                busy_timeout_ms: 5_000,
                max_write_retries: 3,
            },
        }
    }
}
