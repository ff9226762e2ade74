//! Routes: a destination plus the ordered AS hops leading to it.
//!
//! A route stored at node X for destination D lists the hops from X's next hop
//! up to and including D. A node's route to itself has no hops at all.
//! Routes are values: once placed in a table they are never mutated, and
//! advertising always builds a fresh copy with [`Route::prepend`].

use std::collections::HashSet;
use std::fmt;

use nightwing_topology::NodeId;
use serde::{Deserialize, Serialize};

/// A path-vector route.
///
/// Equality is structural: same destination and the same hops in the same
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    destination: NodeId,
    hops: Vec<NodeId>,
}

impl Route {
    /// The trivial route a node originates for itself.
    pub fn origin(destination: NodeId) -> Self {
        Self {
            destination,
            hops: Vec::new(),
        }
    }

    /// Build a route from explicit hops (next hop first).
    pub fn with_hops(destination: NodeId, hops: Vec<NodeId>) -> Self {
        Self { destination, hops }
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn hops(&self) -> &[NodeId] {
        &self.hops
    }

    /// Hop count.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// True for a node's route to itself.
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// First hop, or the destination itself for an origin route.
    pub fn next_hop(&self) -> NodeId {
        self.hops.first().copied().unwrap_or(self.destination)
    }

    /// Loop test: whether `id` already appears on the path.
    pub fn contains(&self, id: NodeId) -> bool {
        self.hops.contains(&id)
    }

    /// Whether any of `ids` appears on the path.
    pub fn contains_any_of(&self, ids: &HashSet<NodeId>) -> bool {
        self.hops.iter().any(|hop| ids.contains(hop))
    }

    /// Copy of this route with `id` inserted in front, as `id` would advertise it.
    pub fn prepend(&self, id: NodeId) -> Self {
        let mut hops = Vec::with_capacity(self.hops.len() + 1);
        hops.push(id);
        hops.extend_from_slice(&self.hops);
        Self {
            destination: self.destination,
            hops,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dst: {} path:", self.destination)?;
        for hop in &self.hops {
            write!(f, " {hop}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(raw: &[u32]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn origin_route_points_at_itself() {
        let route = Route::origin(NodeId(7));
        assert_eq!(route.len(), 0);
        assert!(route.is_empty());
        assert_eq!(route.next_hop(), NodeId(7));
        assert!(!route.contains(NodeId(7)));
    }

    #[test]
    fn prepend_builds_a_new_route() {
        let base = Route::with_hops(NodeId(3), ids(&[2, 3]));
        let advertised = base.prepend(NodeId(1));

        assert_eq!(advertised.hops(), &ids(&[1, 2, 3])[..]);
        assert_eq!(advertised.next_hop(), NodeId(1));
        assert_eq!(advertised.destination(), NodeId(3));
        // The original is untouched
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let a = Route::with_hops(NodeId(9), ids(&[1, 2, 9]));
        let b = Route::with_hops(NodeId(9), ids(&[2, 1, 9]));
        let c = Route::with_hops(NodeId(8), ids(&[1, 2, 9]));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn contains_any_of_checks_hops() {
        let route = Route::with_hops(NodeId(5), ids(&[4, 5]));
        let warden: HashSet<NodeId> = ids(&[4]).into_iter().collect();
        let other: HashSet<NodeId> = ids(&[1, 2]).into_iter().collect();
        assert!(route.contains_any_of(&warden));
        assert!(!route.contains_any_of(&other));
    }

    #[test]
    fn display_matches_log_format() {
        let route = Route::with_hops(NodeId(3), ids(&[2, 3]));
        assert_eq!(route.to_string(), "dst: 3 path: 2 3");
        assert_eq!(Route::origin(NodeId(3)).to_string(), "dst: 3 path:");
    }

    proptest! {
        #[test]
        fn prepended_node_is_detected_as_loop(
            hops in prop::collection::vec(0u32..1000, 0..12),
            front in 0u32..1000,
        ) {
            let route = Route::with_hops(NodeId(1000), ids(&hops));
            let extended = route.prepend(NodeId(front));
            prop_assert!(extended.contains(NodeId(front)));
            prop_assert_eq!(extended.len(), route.len() + 1);
            prop_assert_eq!(extended.next_hop(), NodeId(front));
        }
    }
}
