//! Nightwing BGP Engine
//!
//! Path-vector routing over AS business relationships, modeled on BGP.
//!
//! # Protocol Model
//!
//! - Each [`Speaker`] keeps one candidate route per neighbor per destination
//!   and installs the single best one.
//! - An advertisement from a neighbor implicitly withdraws whatever that
//!   neighbor said before about the same destination.
//! - Routes whose path already contains the receiver are rejected.
//! - Selection prefers customer-learned over peer-learned over
//!   provider-learned routes, then shorter paths, then the lower next-hop id.
//! - Export is valley-free: only our own prefix and customer-learned routes go
//!   to peers and providers; everything goes to customers.
//! - Changes are batched: processing only marks destinations dirty, and
//!   [`Speaker::release_pending`] emits advertisements and withdrawals later.
//!
//! # Round Driving
//!
//! This crate has no scheduler. A driver repeatedly calls
//! [`Speaker::process_one`] on every speaker and, once no updates are queued
//! anywhere but some speaker is dirty, [`Speaker::release_pending`] on all of
//! them. See `nightwing-sim` for the parallel implementation.

mod error;
mod network;
mod route;
mod selection;
mod speaker;
mod update;

pub use error::{BgpError, Result};
pub use network::Network;
pub use route::Route;
pub use selection::{select_best, RouteClass};
pub use speaker::Speaker;
pub use update::{Update, UpdateSink};

pub use nightwing_topology::NodeId;
