//! Frozen post-prune topology.
//!
//! After construction the graph becomes a flat table: nodes live in a `Vec`
//! and are addressed through an identity-to-slot index. Neither is mutated
//! again, so the routing engine can share it across worker threads without
//! locking.
//!
//! # Customer-less Prune
//!
//! Nodes with no customers only ever originate and sink traffic, so they can be
//! left out of the routing run and have their routes reconstructed from their
//! providers afterwards. Privileged nodes and nodes adjacent to a privileged
//! node always stay. Candidates are picked against the pre-prune graph and then
//! removed together, each one symmetrically stripped from its neighbors.

use std::collections::HashMap;

use tracing::info;

use crate::{AsGraph, AsNode, NodeId};

/// A node removed by the prune step, with its last-known neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrunedNode {
    /// Identity of the removed node.
    pub id: NodeId,
    /// Providers it had at the time of removal.
    pub providers: Vec<NodeId>,
    /// Peers it had at the time of removal.
    pub peers: Vec<NodeId>,
}

/// Immutable node table handed to the routing engine.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<AsNode>,
    index: HashMap<NodeId, usize>,
    pruned: Vec<PrunedNode>,
}

impl Topology {
    fn from_parts(nodes: Vec<AsNode>, pruned: Vec<PrunedNode>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (node.id(), slot))
            .collect();
        Self {
            nodes,
            index,
            pruned,
        }
    }

    /// Active nodes in ascending identity order.
    pub fn nodes(&self) -> &[AsNode] {
        &self.nodes
    }

    /// Table slot of a node.
    pub fn slot_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&AsNode> {
        self.slot_of(id).map(|slot| &self.nodes[slot])
    }

    /// Side-table of nodes removed by pruning.
    pub fn pruned(&self) -> &[PrunedNode] {
        &self.pruned
    }

    pub fn pruned_node(&self, id: NodeId) -> Option<&PrunedNode> {
        self.pruned.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Split into the node table and the pruned side-table.
    pub fn into_parts(self) -> (Vec<AsNode>, Vec<PrunedNode>) {
        (self.nodes, self.pruned)
    }
}

impl AsGraph {
    /// Freeze the graph as-is, without pruning.
    pub fn freeze(self) -> Topology {
        Topology::from_parts(self.nodes.into_values().collect(), Vec::new())
    }

    /// Remove customer-less nodes and freeze the remainder.
    pub fn prune_customerless(mut self) -> Topology {
        let doomed: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| node.customer_count() == 0)
            .filter(|node| !node.is_privileged() && !self.touches_privileged(node))
            .map(AsNode::id)
            .collect();

        // Records come from the pre-prune graph so pruned peers keep each other
        let pruned: Vec<PrunedNode> = doomed
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|node| PrunedNode {
                id: node.id(),
                providers: node.providers().iter().copied().collect(),
                peers: node.peers().iter().copied().collect(),
            })
            .collect();

        for id in &doomed {
            let Some(node) = self.nodes.remove(id) else {
                continue;
            };
            for neighbor in node.neighbors() {
                if let Some(other) = self.nodes.get_mut(&neighbor) {
                    other.detach(*id);
                }
            }
        }

        info!(
            removed = pruned.len(),
            remaining = self.nodes.len(),
            "pruned customer-less nodes"
        );

        Topology::from_parts(self.nodes.into_values().collect(), pruned)
    }

    fn touches_privileged(&self, node: &AsNode) -> bool {
        node.neighbors()
            .any(|n| self.nodes.get(&n).is_some_and(AsNode::is_privileged))
    }
}
