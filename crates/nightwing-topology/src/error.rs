//! Error types for nightwing-topology.

use thiserror::Error;

use crate::{NodeId, Relation};

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors raised while building or loading a topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Reading an input file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A relationship record could not be parsed.
    #[error("malformed record on line {line} ({record:?}): {reason}")]
    Malformed {
        line: usize,
        record: String,
        reason: String,
    },

    /// A relationship code outside the supported set.
    #[error("unknown relationship code {code} on line {line}")]
    UnknownRelation { line: usize, code: i32 },

    /// An edge from a node to itself.
    #[error("node {0} cannot have a relationship with itself")]
    SelfRelation(NodeId),

    /// The privileged set names a node missing from the topology.
    #[error("privileged node {0} is not in the topology")]
    UnknownPrivileged(NodeId),

    /// An edge is present on one side only.
    #[error("node {node} lists {neighbor} as {relation:?} without the mirror edge")]
    Asymmetric {
        node: NodeId,
        neighbor: NodeId,
        relation: Relation,
    },

    /// A lookup against a node that does not exist.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}
