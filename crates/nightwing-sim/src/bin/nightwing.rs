//! Nightwing convergence runner
//!
//! Loads an AS relationship file and a privileged-set file, converges BGP
//! routing over the topology and prints a run summary.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use nightwing_sim::{converge, init_logging, load_network, SimConfig};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "nightwing", version, about = "Converge BGP routing over an AS topology")]
struct Args {
    /// Relationship records (`left|right|code`)
    #[arg(long)]
    topology: PathBuf,

    /// Privileged node ids, one per line
    #[arg(long)]
    privileged: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Nodes per dispatch block
    #[arg(long)]
    block_size: Option<usize>,

    /// Keep customer-less nodes in the routing run
    #[arg(long)]
    no_prune: bool,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Write the run report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn resolve_config(&self) -> nightwing_sim::Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)?,
            None => SimConfig::default(),
        };
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if self.no_prune {
            config.prune_customerless = false;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(args: &Args, config: &SimConfig) -> nightwing_sim::Result<()> {
    info!(?config, "starting nightwing");

    let network = Arc::new(load_network(&args.topology, &args.privileged, config)?);
    let report = converge(Arc::clone(&network), config)?;

    println!("{report}");
    println!("  pruned nodes: {}", network.pruned().len());
    println!("  privileged nodes: {}", network.privileged().count());

    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(args.log_level.as_deref().unwrap_or("info"));
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.log_level);
    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}
