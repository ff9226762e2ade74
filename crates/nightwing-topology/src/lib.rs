//! Nightwing AS Topology
//!
//! Autonomous-system relationship graphs for decoy routing simulation.
//!
//! # Lifecycle
//!
//! 1. Relationship records build a mutable [`AsGraph`]; every edge is
//!    installed on both endpoints together.
//! 2. The privileged set (e.g. a censoring "warden") is flagged on its nodes.
//! 3. The graph is frozen into a [`Topology`], optionally dropping
//!    customer-less nodes into a side-table of [`PrunedNode`]s first.
//!
//! After step 3 nothing structural changes. The routing engine only ever sees
//! the frozen flat table.
//!
//! # Relationship Model
//!
//! Three disjoint neighbor sets per node: providers, peers, customers.
//! A has B as customer ⇔ B has A as provider; peering is mutual.

mod error;
mod graph;
mod id;
mod parse;
mod relation;
mod topology;

pub use error::{Result, TopologyError};
pub use graph::{AsGraph, AsNode};
pub use id::NodeId;
pub use parse::{apply_privileged, load_graph, parse_relationships};
pub use relation::{Relation, CODE_CUSTOMER, CODE_IGNORE, CODE_PEER, CODE_PROVIDER};
pub use topology::{PrunedNode, Topology};
