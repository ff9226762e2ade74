//! Summary of a finished convergence run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Counters collected by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// Active speakers
    pub nodes: usize,
    /// Dispatch blocks per round
    pub blocks: usize,
    /// Processing rounds until the fixed point
    pub rounds: u64,
    /// Release broadcasts
    pub releases: u64,
    /// Inbound updates drained
    pub messages_processed: u64,
    /// Advertisements and withdrawals emitted by releases
    pub updates_sent: u64,
    /// Installed routes summed over all speakers
    pub installed_routes: usize,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes converged in {} rounds ({} releases, {} messages, {} routes, {} ms)",
            self.nodes,
            self.rounds,
            self.releases,
            self.messages_processed,
            self.installed_routes,
            self.elapsed_ms
        )
    }
}
