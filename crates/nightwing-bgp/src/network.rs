//! The flat speaker table and the query surface used by analysis code.
//!
//! Speakers are stored in a `Vec` in ascending identity order and addressed
//! through an identity index. Neither changes after construction, so the
//! network can be shared across worker threads without synchronisation;
//! per-speaker state carries its own locking.

use std::collections::HashMap;

use nightwing_topology::{NodeId, PrunedNode, Topology};
use tracing::debug;

use crate::selection::select_best;
use crate::{BgpError, Result, Route, RouteClass, Speaker, Update, UpdateSink};

/// Every active speaker plus the pruned side-table.
#[derive(Debug)]
pub struct Network {
    speakers: Vec<Speaker>,
    index: HashMap<NodeId, usize>,
    pruned: Vec<PrunedNode>,
}

impl Network {
    /// Build speakers with empty routing state from a frozen topology.
    pub fn new(topology: Topology) -> Self {
        let (nodes, pruned) = topology.into_parts();
        let speakers: Vec<Speaker> = nodes.into_iter().map(Speaker::new).collect();
        let index = speakers
            .iter()
            .enumerate()
            .map(|(slot, s)| (s.id(), slot))
            .collect();
        debug!(
            speakers = speakers.len(),
            pruned = pruned.len(),
            "network built"
        );
        Self {
            speakers,
            index,
            pruned,
        }
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn speaker(&self, id: NodeId) -> Option<&Speaker> {
        self.index.get(&id).map(|&slot| &self.speakers[slot])
    }

    fn require(&self, id: NodeId) -> Result<&Speaker> {
        self.speaker(id).ok_or(BgpError::UnknownNode(id))
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    /// Give every speaker its trivial route to itself.
    pub fn originate_all(&self) {
        for speaker in &self.speakers {
            speaker.originate();
        }
    }

    /// Whether any speaker still has inbound updates queued.
    pub fn has_pending_messages(&self) -> bool {
        self.speakers.iter().any(Speaker::has_pending)
    }

    /// Whether any speaker has unreleased route changes.
    pub fn has_dirty(&self) -> bool {
        self.speakers.iter().any(Speaker::has_dirty)
    }

    /// Installed route from `at` to `destination`.
    pub fn best_route(&self, at: NodeId, destination: NodeId) -> Result<Option<Route>> {
        Ok(self.require(at)?.best_route(destination))
    }

    /// Every candidate route `at` holds for `destination`.
    pub fn all_candidates(&self, at: NodeId, destination: NodeId) -> Result<Vec<Route>> {
        Ok(self.require(at)?.all_candidates(destination))
    }

    /// Route a node would select if it hung off `providers`.
    ///
    /// Each provider's installed route is extended with that provider, as the
    /// provider would advertise it to a customer, and the usual selection runs
    /// over the result. The asking node is never added to the simulation.
    pub fn best_route_if_attached(
        &self,
        providers: &[NodeId],
        destination: NodeId,
    ) -> Result<Option<Route>> {
        let mut offered = Vec::with_capacity(providers.len());
        for &provider in providers {
            if let Some(route) = self.require(provider)?.best_route(destination) {
                offered.push(route.prepend(provider));
            }
        }
        Ok(select_best(&offered, |_| Ok(RouteClass::Provider))?.cloned())
    }

    /// [`best_route_if_attached`](Self::best_route_if_attached) for a node
    /// removed by the prune step, using its recorded providers.
    pub fn best_route_from_pruned(&self, pruned: NodeId, destination: NodeId) -> Result<Option<Route>> {
        let node = self.pruned_node(pruned).ok_or(BgpError::UnknownNode(pruned))?;
        let route = self.best_route_if_attached(&node.providers, destination)?;
        Ok(route.filter(|r| !r.contains(pruned)))
    }

    /// Nodes removed before convergence.
    pub fn pruned(&self) -> &[PrunedNode] {
        &self.pruned
    }

    pub fn pruned_node(&self, id: NodeId) -> Option<&PrunedNode> {
        self.pruned.iter().find(|p| p.id == id)
    }

    /// Speakers in the privileged set.
    pub fn privileged(&self) -> impl Iterator<Item = &Speaker> {
        self.speakers.iter().filter(|s| s.is_privileged())
    }

    /// Clear every speaker's scratch mark.
    pub fn reset_marks(&self) {
        for speaker in &self.speakers {
            speaker.reset_mark();
        }
    }

    /// Total installed routes across all speakers.
    pub fn installed_route_count(&self) -> usize {
        self.speakers.iter().map(Speaker::installed_count).sum()
    }
}

impl UpdateSink for Network {
    fn deliver(&self, to: NodeId, update: Update) -> Result<()> {
        self.require(to)?.enqueue(update);
        Ok(())
    }
}
