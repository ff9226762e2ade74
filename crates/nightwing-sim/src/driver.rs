//! Round-synchronised parallel convergence driver.
//!
//! # Rounds
//!
//! Speakers are split once into fixed-size blocks of consecutive table slots.
//! A round pushes every block onto a shared job channel; a pool of worker
//! threads pulls blocks and calls [`Speaker::process_one`] exactly once per
//! speaker. The driver then waits for one completion per block. That barrier
//! bounds a round to at most one drained update per speaker, even though the
//! order of work inside a round is unspecified.
//!
//! # Release Rule
//!
//! After the barrier:
//! - updates still queued anywhere → another round
//! - otherwise, some speaker dirty → broadcast
//!   [`Speaker::release_pending`] through the same pool, then another round
//! - otherwise → converged
//!
//! Releasing exactly when the run would otherwise stall stands in for a
//! per-node MRAI timer. How many changes get batched into one release depends
//! on scheduling, not on wall-clock time.
//!
//! # Termination
//!
//! There is no round limit. Relationship structures that defeat valley-free
//! export can oscillate forever.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender};
use nightwing_bgp::{BgpError, Network, Speaker};
use tracing::{debug, info, trace, warn};

use crate::{ConvergenceReport, Result, SimConfig, SimError};

/// Where the driver is in its round loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Built and self-originated, no round run yet.
    Idle,
    /// Pushing processing jobs to the pool.
    Dispatching,
    /// Waiting for every block of the current round.
    AwaitingBarrier,
    /// Pushing release jobs to the pool.
    Draining,
    /// No queued updates and no dirty destinations anywhere.
    Converged,
}

/// What a worker does with a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Process,
    Release,
}

#[derive(Debug)]
struct Job {
    phase: Phase,
    block: usize,
}

#[derive(Debug)]
enum BlockFailure {
    Bgp(BgpError),
    Panicked,
}

#[derive(Debug)]
struct BlockDone {
    worker: usize,
    block: usize,
    outcome: std::result::Result<u64, BlockFailure>,
}

/// Drives a [`Network`] to its routing fixed point.
pub struct ConvergenceDriver {
    network: Arc<Network>,
    blocks: Arc<Vec<Range<usize>>>,
    jobs: Option<Sender<Job>>,
    done: Receiver<BlockDone>,
    workers: Vec<JoinHandle<()>>,
    state: DriverState,
    progress_interval: u64,
}

impl ConvergenceDriver {
    /// Partition the network, start the worker pool and self-originate every
    /// speaker.
    pub fn new(network: Arc<Network>, config: &SimConfig) -> Result<Self> {
        config.validate()?;

        let blocks = Arc::new(partition(network.len(), config.block_size));
        let (job_tx, job_rx) = channel::unbounded::<Job>();
        let (done_tx, done_rx) = channel::unbounded::<BlockDone>();

        let mut workers = Vec::with_capacity(config.workers);
        for worker in 0..config.workers {
            let network = Arc::clone(&network);
            let blocks = Arc::clone(&blocks);
            let jobs = job_rx.clone();
            let done = done_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("nightwing-worker-{worker}"))
                .spawn(move || worker_loop(worker, &network, &blocks, &jobs, &done))?;
            workers.push(handle);
        }

        network.originate_all();

        info!(
            nodes = network.len(),
            blocks = blocks.len(),
            workers = config.workers,
            block_size = config.block_size,
            "convergence driver ready"
        );

        Ok(Self {
            network,
            blocks,
            jobs: Some(job_tx),
            done: done_rx,
            workers,
            state: DriverState::Idle,
            progress_interval: config.progress_interval,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    /// Number of dispatch blocks per round.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Run rounds until the network converges.
    pub fn run(&mut self) -> Result<ConvergenceReport> {
        let started = Instant::now();
        let mut report = ConvergenceReport {
            nodes: self.network.len(),
            blocks: self.blocks.len(),
            ..Default::default()
        };

        loop {
            report.messages_processed += self.round(Phase::Process)?;
            report.rounds += 1;

            if self.progress_interval > 0 && report.rounds % self.progress_interval == 0 {
                info!(
                    rounds = report.rounds,
                    releases = report.releases,
                    messages = report.messages_processed,
                    "convergence in progress"
                );
            }

            if self.network.has_pending_messages() {
                continue;
            }

            if self.network.has_dirty() {
                let sent = self.round(Phase::Release)?;
                report.releases += 1;
                report.updates_sent += sent;
                debug!(round = report.rounds, updates = sent, "released pending updates");
                continue;
            }

            self.transition(DriverState::Converged);
            break;
        }

        report.installed_routes = self.network.installed_route_count();
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(%report, "converged");
        Ok(report)
    }

    /// Dispatch one pass over every block and wait for all of them.
    fn round(&mut self, phase: Phase) -> Result<u64> {
        self.transition(match phase {
            Phase::Process => DriverState::Dispatching,
            Phase::Release => DriverState::Draining,
        });

        let jobs = self.jobs.as_ref().ok_or(SimError::PoolDisconnected)?;
        for block in 0..self.blocks.len() {
            jobs.send(Job { phase, block })
                .map_err(|_| SimError::PoolDisconnected)?;
        }

        self.transition(DriverState::AwaitingBarrier);

        // Collect every completion before reporting a failure so nothing from
        // this round is still in flight afterwards.
        let mut total = 0;
        let mut failure = None;
        for _ in 0..self.blocks.len() {
            let done = self.done.recv().map_err(|_| SimError::PoolDisconnected)?;
            match done.outcome {
                Ok(count) => total += count,
                Err(err) if failure.is_none() => {
                    failure = Some(match err {
                        BlockFailure::Bgp(e) => SimError::Bgp(e),
                        BlockFailure::Panicked => SimError::WorkerPanicked {
                            worker: done.worker,
                            block: done.block,
                        },
                    });
                }
                Err(_) => {}
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(total),
        }
    }

    fn transition(&mut self, next: DriverState) {
        trace!(from = ?self.state, to = ?next, "driver state");
        self.state = next;
    }
}

impl Drop for ConvergenceDriver {
    fn drop(&mut self) {
        // Closing the job channel lets every worker fall out of its loop
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread exited abnormally");
            }
        }
    }
}

/// Split `len` table slots into consecutive blocks of at most `block_size`.
fn partition(len: usize, block_size: usize) -> Vec<Range<usize>> {
    (0..len)
        .step_by(block_size)
        .map(|start| start..(start + block_size).min(len))
        .collect()
}

fn worker_loop(
    worker: usize,
    network: &Network,
    blocks: &[Range<usize>],
    jobs: &Receiver<Job>,
    done: &Sender<BlockDone>,
) {
    while let Ok(Job { phase, block }) = jobs.recv() {
        let speakers = &network.speakers()[blocks[block].clone()];
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_block(network, speakers, phase)))
            .unwrap_or(Err(BlockFailure::Panicked));

        if done.send(BlockDone { worker, block, outcome }).is_err() {
            break;
        }
    }
}

fn run_block(
    network: &Network,
    speakers: &[Speaker],
    phase: Phase,
) -> std::result::Result<u64, BlockFailure> {
    let mut count = 0;
    for speaker in speakers {
        match phase {
            Phase::Process => {
                if speaker.process_one().map_err(BlockFailure::Bgp)? {
                    count += 1;
                }
            }
            Phase::Release => {
                count += speaker.release_pending(network).map_err(BlockFailure::Bgp)? as u64;
            }
        }
    }
    Ok(count)
}
