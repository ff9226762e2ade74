//! Build-time AS relationship graph.
//!
//! `AsGraph` is the only mutable form of the topology. It is filled from
//! relationship records, has its privileged set applied, optionally gets
//! pruned, and is then frozen into an immutable [`Topology`](crate::Topology)
//! before any routing starts.
//!
//! # Symmetry
//!
//! Every edge is installed on both endpoints in the same call:
//! A has B as customer ⇔ B has A as provider, and peering is mutual.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::{NodeId, Relation, Result, TopologyError};

/// One autonomous system and its neighbor sets.
///
/// The three sets are disjoint; a neighbor appears in exactly one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsNode {
    id: NodeId,
    providers: BTreeSet<NodeId>,
    peers: BTreeSet<NodeId>,
    customers: BTreeSet<NodeId>,
    privileged: bool,
}

impl AsNode {
    /// Create an isolated node.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            providers: BTreeSet::new(),
            peers: BTreeSet::new(),
            customers: BTreeSet::new(),
            privileged: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Nodes selling transit to this one.
    pub fn providers(&self) -> &BTreeSet<NodeId> {
        &self.providers
    }

    pub fn peers(&self) -> &BTreeSet<NodeId> {
        &self.peers
    }

    /// Nodes buying transit from this one.
    pub fn customers(&self) -> &BTreeSet<NodeId> {
        &self.customers
    }

    /// Whether this node belongs to the externally designated target set.
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Total number of neighbors.
    pub fn degree(&self) -> usize {
        self.providers.len() + self.peers.len() + self.customers.len()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// The role `other` plays toward this node, if it is a neighbor.
    ///
    /// `Some(Relation::Provider)` means `other` is one of our providers.
    pub fn role_of(&self, other: NodeId) -> Option<Relation> {
        if self.providers.contains(&other) {
            Some(Relation::Provider)
        } else if self.peers.contains(&other) {
            Some(Relation::Peer)
        } else if self.customers.contains(&other) {
            Some(Relation::Customer)
        } else {
            None
        }
    }

    /// Iterate over every neighbor regardless of relationship.
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.providers
            .iter()
            .chain(self.peers.iter())
            .chain(self.customers.iter())
            .copied()
    }

    fn set_for(&mut self, role: Relation) -> Option<&mut BTreeSet<NodeId>> {
        match role {
            Relation::Provider => Some(&mut self.providers),
            Relation::Peer => Some(&mut self.peers),
            Relation::Customer => Some(&mut self.customers),
            Relation::Ignore => None,
        }
    }

    /// Record `other` in the set matching the role it plays toward us.
    fn attach(&mut self, other: NodeId, role: Relation) {
        if let Some(set) = self.set_for(role) {
            set.insert(other);
        }
    }

    /// Remove `other` from whichever set holds it.
    pub(crate) fn detach(&mut self, other: NodeId) -> Option<Relation> {
        let role = self.role_of(other)?;
        if let Some(set) = self.set_for(role) {
            set.remove(&other);
        }
        Some(role)
    }
}

/// Mutable relationship graph used during topology construction.
#[derive(Debug, Clone, Default)]
pub struct AsGraph {
    pub(crate) nodes: BTreeMap<NodeId, AsNode>,
}

impl AsGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(left, right, relation)` triples.
    pub fn from_edges<I>(edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, u32, Relation)>,
    {
        let mut graph = Self::new();
        for (left, right, relation) in edges {
            graph.add_relation(NodeId(left), NodeId(right), relation)?;
        }
        Ok(graph)
    }

    /// Get or create the node with the given identity.
    pub fn ensure_node(&mut self, id: NodeId) -> &mut AsNode {
        self.nodes.entry(id).or_insert_with(|| AsNode::new(id))
    }

    /// Install an edge and its mirror.
    ///
    /// `relation` is the role `left` plays toward `right`. Both endpoints are
    /// created if missing, including for [`Relation::Ignore`] which otherwise
    /// leaves the graph unchanged. Re-adding the same edge is a no-op; adding a
    /// different relationship for an existing pair replaces the old one.
    pub fn add_relation(&mut self, left: NodeId, right: NodeId, relation: Relation) -> Result<()> {
        if left == right {
            return Err(TopologyError::SelfRelation(left));
        }

        self.ensure_node(left);
        self.ensure_node(right);

        if relation == Relation::Ignore {
            return Ok(());
        }

        // `right` sees `left` in the role `relation`; `left` sees the mirror
        let existing = self.nodes.get(&right).and_then(|n| n.role_of(left));
        match existing {
            Some(role) if role == relation => return Ok(()),
            Some(role) => {
                warn!(%left, %right, old = ?role, new = ?relation, "replacing conflicting relationship");
                self.detach_pair(left, right);
            }
            None => {}
        }

        if let Some(node) = self.nodes.get_mut(&right) {
            node.attach(left, relation);
        }
        if let Some(node) = self.nodes.get_mut(&left) {
            node.attach(right, relation.mirror());
        }
        Ok(())
    }

    fn detach_pair(&mut self, a: NodeId, b: NodeId) {
        if let Some(node) = self.nodes.get_mut(&a) {
            node.detach(b);
        }
        if let Some(node) = self.nodes.get_mut(&b) {
            node.detach(a);
        }
    }

    /// Flag a node as a member of the privileged set.
    pub fn mark_privileged(&mut self, id: NodeId) -> Result<()> {
        self.set_privileged(id, true)
    }

    /// Set or clear a node's privileged flag.
    ///
    /// The flag can only change on the build-time graph. Once frozen into a
    /// [`Topology`](crate::Topology) it is read-only, and the prune step uses
    /// whatever value it has at that point.
    pub fn set_privileged(&mut self, id: NodeId, privileged: bool) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(TopologyError::UnknownPrivileged(id))?;
        node.privileged = privileged;
        Ok(())
    }

    /// Flip a node's privileged flag and return the new value.
    pub fn toggle_privileged(&mut self, id: NodeId) -> Result<bool> {
        let flipped = !self
            .node(id)
            .ok_or(TopologyError::UnknownPrivileged(id))?
            .is_privileged();
        self.set_privileged(id, flipped)?;
        Ok(flipped)
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&AsNode> {
        self.nodes.get(&id)
    }

    /// Iterate over nodes in ascending identity order.
    pub fn nodes(&self) -> impl Iterator<Item = &AsNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(AsNode::degree).sum::<usize>() / 2
    }

    /// Identities of all privileged nodes.
    pub fn privileged(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().filter(|n| n.privileged).map(|n| n.id)
    }

    /// Check that every edge has its mirror on the other endpoint.
    pub fn validate_symmetry(&self) -> Result<()> {
        for node in self.nodes.values() {
            for neighbor in node.neighbors() {
                let relation = node.role_of(neighbor).unwrap_or(Relation::Ignore);
                let mirrored = self
                    .nodes
                    .get(&neighbor)
                    .and_then(|other| other.role_of(node.id));
                if mirrored != Some(relation.mirror()) {
                    return Err(TopologyError::Asymmetric {
                        node: node.id,
                        neighbor,
                        relation,
                    });
                }
            }
        }
        Ok(())
    }
}
