//! Error types for nightwing-bgp.

use nightwing_topology::NodeId;
use thiserror::Error;

/// Result type for routing engine operations.
pub type Result<T> = std::result::Result<T, BgpError>;

/// Errors raised by the routing engine.
///
/// All of these indicate a broken model invariant or a caller bug; none of
/// them are recoverable inside a run.
#[derive(Debug, Error)]
pub enum BgpError {
    /// A relationship class was requested for a node that is neither a
    /// current neighbor nor the speaker itself.
    #[error("node {other} is not a neighbor of {node}")]
    NotANeighbor { node: NodeId, other: NodeId },

    /// An update or query addressed a node missing from the table.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Placement tried to mark a privileged node.
    #[error("refusing to mark privileged node {0}")]
    MarkPrivileged(NodeId),
}
