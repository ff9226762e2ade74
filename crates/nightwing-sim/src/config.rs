//! Simulation configuration.
//!
//! Values come from [`SimConfig::default`], optionally overlaid by a TOML file
//! (missing keys keep their defaults), and finally by command-line flags.
//!
//! ```toml
//! workers = 8
//! block_size = 40
//! progress_interval = 1000
//! prune_customerless = true
//! log_level = "info"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// Worker threads used when nothing else is configured.
pub const DEFAULT_WORKERS: usize = 8;

/// Nodes per dispatch block. Smaller blocks spread work more evenly but cost
/// more channel traffic per round.
pub const DEFAULT_BLOCK_SIZE: usize = 40;

/// Rounds between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// Configuration for a convergence run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Worker threads in the pool
    pub workers: usize,
    /// Nodes per dispatch block
    pub block_size: usize,
    /// Rounds between progress log lines; 0 disables them
    pub progress_interval: u64,
    /// Drop customer-less nodes before converging
    pub prune_customerless: bool,
    /// Default tracing filter level
    pub log_level: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            block_size: DEFAULT_BLOCK_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            prune_customerless: true,
            log_level: "info".to_string(),
        }
    }
}

impl SimConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Reject values the driver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SimError::Config("workers must be at least 1".into()));
        }
        if self.block_size == 0 {
            return Err(SimError::Config("block_size must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert_eq!(config.workers, 8);
        assert_eq!(config.block_size, 40);
        assert!(config.prune_customerless);
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = SimConfig::from_toml("workers = 2\n").unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let err = SimConfig::from_toml("block_size = 0\n").unwrap_err();
        assert!(matches!(err, SimError::Config(msg) if msg.contains("block_size")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            SimConfig::from_toml("mrai_seconds = 30\n"),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nightwing.toml");
        fs::write(&path, "workers = 3\nprune_customerless = false\n").unwrap();

        let config = SimConfig::from_file(&path).unwrap();
        assert_eq!(config.workers, 3);
        assert!(!config.prune_customerless);
    }
}
