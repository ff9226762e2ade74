//! Nightwing Convergence Simulation
//!
//! Parallel, round-synchronised driver that takes an AS topology to its
//! BGP routing fixed point, plus the configuration, logging and run
//! reporting around it.
//!
//! # Pipeline
//!
//! 1. Load relationship and privileged-set files into an `AsGraph`
//! 2. Validate symmetry, optionally prune customer-less nodes, freeze
//! 3. Build the speaker table and self-originate every node
//! 4. Run rounds on a worker pool until nothing is queued or dirty
//!
//! Analysis code then reads routes through `nightwing_bgp::Network`.

mod config;
mod driver;
mod error;
mod logging;
mod report;
mod simulation;

pub use config::{SimConfig, DEFAULT_BLOCK_SIZE, DEFAULT_PROGRESS_INTERVAL, DEFAULT_WORKERS};
pub use driver::{ConvergenceDriver, DriverState};
pub use error::{Result, SimError};
pub use logging::init_logging;
pub use report::ConvergenceReport;
pub use simulation::{build_network, converge, load_network};
