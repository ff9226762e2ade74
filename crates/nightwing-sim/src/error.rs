//! Error types for nightwing-sim.

use nightwing_bgp::BgpError;
use nightwing_topology::TopologyError;
use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Topology could not be loaded or validated.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// The routing engine hit a broken invariant.
    #[error("routing error: {0}")]
    Bgp(#[from] BgpError),

    /// Configuration file or values are invalid.
    #[error("invalid config: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A worker panicked while processing a block.
    #[error("worker {worker} panicked while processing block {block}")]
    WorkerPanicked { worker: usize, block: usize },

    /// The worker pool went away mid-round.
    #[error("worker pool disconnected")]
    PoolDisconnected,
}

impl From<toml::de::Error> for SimError {
    fn from(e: toml::de::Error) -> Self {
        SimError::Config(e.to_string())
    }
}
