//! A single protocol speaker (one autonomous system).
//!
//! # Inbound Processing
//!
//! [`Speaker::process_one`] drains exactly one update from the inbound queue.
//! An advertisement replaces whatever the same neighbor previously offered for
//! that destination (implicit withdrawal), unless the path already contains
//! this speaker, in which case it is dropped after the old entry is removed.
//! A withdrawal just clears the neighbor's entry. Either way the best route for
//! the destination is recomputed, and a change only marks the destination
//! dirty. Nothing is sent yet.
//!
//! # Deferred Export
//!
//! [`Speaker::release_pending`] turns every dirty destination into outbound
//! updates. The installed route, with this speaker prepended, goes to every
//! customer, and to peers and providers only if it is our own prefix or was
//! learned from a customer (valley-free). Neighbors that got the previous
//! advertisement but are not in the new recipient set receive an explicit
//! withdrawal.
//!
//! # Concurrency
//!
//! The inbound queue is lock-free and accepts updates from any thread. The
//! routing tables sit behind a mutex that is only taken by the worker that owns
//! this speaker for the current round, or by queries between runs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::queue::SegQueue;
use nightwing_topology::{AsNode, NodeId};
use parking_lot::Mutex;
use tracing::trace;

use crate::selection::select_best;
use crate::{BgpError, Result, Route, RouteClass, Update, UpdateSink};

/// Routing tables of one speaker.
#[derive(Debug, Default)]
struct RibState {
    /// Destination → neighbor → route that neighbor last advertised.
    candidates: HashMap<NodeId, BTreeMap<NodeId, Route>>,
    /// Destination → installed best route.
    installed: HashMap<NodeId, Route>,
    /// Destination → neighbors that got our last advertisement.
    advertised_to: HashMap<NodeId, BTreeSet<NodeId>>,
    /// Destinations whose installed route changed since the last release.
    dirty: BTreeSet<NodeId>,
}

/// One protocol speaker.
#[derive(Debug)]
pub struct Speaker {
    node: AsNode,
    marked: AtomicBool,
    inbox: SegQueue<Update>,
    rib: Mutex<RibState>,
}

impl Speaker {
    /// Wrap a topology node with empty routing state.
    pub fn new(node: AsNode) -> Self {
        Self {
            node,
            marked: AtomicBool::new(false),
            inbox: SegQueue::new(),
            rib: Mutex::new(RibState::default()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Relationship sets and privileged flag.
    pub fn node(&self) -> &AsNode {
        &self.node
    }

    pub fn degree(&self) -> usize {
        self.node.degree()
    }

    pub fn customer_count(&self) -> usize {
        self.node.customer_count()
    }

    pub fn is_privileged(&self) -> bool {
        self.node.is_privileged()
    }

    /// Scratch flag for placement heuristics. Not protocol state.
    pub fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Relaxed)
    }

    /// Set the scratch flag. Privileged nodes cannot be marked.
    pub fn mark(&self) -> Result<()> {
        if self.is_privileged() {
            return Err(BgpError::MarkPrivileged(self.id()));
        }
        self.marked.store(true, Ordering::Relaxed);
        Ok(())
    }

    pub fn reset_mark(&self) {
        self.marked.store(false, Ordering::Relaxed);
    }

    /// Relationship class of `other` as seen from this speaker.
    pub fn relation_class(&self, other: NodeId) -> Result<RouteClass> {
        if other == self.id() {
            return Ok(RouteClass::Origin);
        }
        self.node
            .role_of(other)
            .and_then(RouteClass::from_role)
            .ok_or(BgpError::NotANeighbor {
                node: self.id(),
                other,
            })
    }

    /// Push an update onto the inbound queue. Safe from any thread.
    pub fn enqueue(&self, update: Update) {
        self.inbox.push(update);
    }

    /// Queue the trivial route to ourselves.
    pub fn originate(&self) {
        self.enqueue(Update::Advertisement(Route::origin(self.id())));
    }

    pub fn has_pending(&self) -> bool {
        !self.inbox.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.inbox.len()
    }

    pub fn has_dirty(&self) -> bool {
        !self.rib.lock().dirty.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.rib.lock().dirty.len()
    }

    /// Drain one inbound update.
    ///
    /// Returns `false` if the queue was empty.
    pub fn process_one(&self) -> Result<bool> {
        let Some(update) = self.inbox.pop() else {
            return Ok(false);
        };

        let neighbor = update.sender();
        let destination = update.destination();
        let mut rib = self.rib.lock();

        let candidates = rib.candidates.entry(destination).or_default();
        candidates.remove(&neighbor);
        if let Update::Advertisement(route) = update {
            if route.contains(self.id()) {
                trace!(node = %self.id(), %route, "dropping looped advertisement");
            } else {
                candidates.insert(neighbor, route);
            }
        }
        if candidates.is_empty() {
            rib.candidates.remove(&destination);
        }

        self.reselect(&mut rib, destination)?;
        Ok(true)
    }

    /// Recompute the best route for `destination` and mark it dirty on change.
    fn reselect(&self, rib: &mut RibState, destination: NodeId) -> Result<()> {
        let best = match rib.candidates.get(&destination) {
            Some(candidates) => {
                select_best(candidates.values(), |hop| self.relation_class(hop))?.cloned()
            }
            None => None,
        };

        if rib.installed.get(&destination) == best.as_ref() {
            return Ok(());
        }

        match best {
            Some(route) => {
                rib.installed.insert(destination, route);
            }
            None => {
                rib.installed.remove(&destination);
            }
        }
        rib.dirty.insert(destination);
        Ok(())
    }

    /// Send advertisements and withdrawals for every dirty destination.
    ///
    /// Returns the number of updates handed to `sink`.
    pub fn release_pending(&self, sink: &dyn UpdateSink) -> Result<usize> {
        let mut rib = self.rib.lock();
        let dirty = std::mem::take(&mut rib.dirty);
        let mut sent = 0;

        for destination in dirty {
            let mut recipients = BTreeSet::new();

            if let Some(best) = rib.installed.get(&destination) {
                let advert = best.prepend(self.id());
                let upstream = best.destination() == self.id()
                    || self.relation_class(best.next_hop())?.exports_upstream();

                let customers = self.node.customers().iter();
                let others = self
                    .node
                    .peers()
                    .iter()
                    .chain(self.node.providers().iter())
                    .filter(|_| upstream);
                for &neighbor in customers.chain(others) {
                    sink.deliver(neighbor, Update::Advertisement(advert.clone()))?;
                    recipients.insert(neighbor);
                    sent += 1;
                }
            }

            let previous = if recipients.is_empty() {
                rib.advertised_to.remove(&destination)
            } else {
                rib.advertised_to.insert(destination, recipients.clone())
            };
            for &stale in previous.iter().flat_map(|p| p.difference(&recipients)) {
                sink.deliver(
                    stale,
                    Update::Withdrawal {
                        destination,
                        from: self.id(),
                    },
                )?;
                sent += 1;
            }
        }

        Ok(sent)
    }

    /// Installed best route to `destination`, if any.
    pub fn best_route(&self, destination: NodeId) -> Option<Route> {
        self.rib.lock().installed.get(&destination).cloned()
    }

    /// Every currently valid candidate route to `destination`.
    pub fn all_candidates(&self, destination: NodeId) -> Vec<Route> {
        self.rib
            .lock()
            .candidates
            .get(&destination)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    /// The route `neighbor` last advertised to us for `destination`.
    pub fn received_route(&self, neighbor: NodeId, destination: NodeId) -> Option<Route> {
        self.rib
            .lock()
            .candidates
            .get(&destination)
            .and_then(|c| c.get(&neighbor))
            .cloned()
    }

    /// Neighbors that received our last advertisement for `destination`.
    pub fn advertised_to(&self, destination: NodeId) -> BTreeSet<NodeId> {
        self.rib
            .lock()
            .advertised_to
            .get(&destination)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of destinations with an installed route.
    pub fn installed_count(&self) -> usize {
        self.rib.lock().installed.len()
    }

    /// Snapshot of every installed route.
    pub fn installed_routes(&self) -> Vec<Route> {
        let rib = self.rib.lock();
        let mut routes: Vec<Route> = rib.installed.values().cloned().collect();
        routes.sort_by_key(Route::destination);
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightwing_topology::{AsGraph, Relation};

    /// Collects delivered updates instead of routing them.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(NodeId, Update)>>,
    }

    impl UpdateSink for RecordingSink {
        fn deliver(&self, to: NodeId, update: Update) -> Result<()> {
            self.sent.lock().push((to, update));
            Ok(())
        }
    }

    impl RecordingSink {
        fn take(&self) -> Vec<(NodeId, Update)> {
            std::mem::take(&mut *self.sent.lock())
        }
    }

    fn id(n: u32) -> NodeId {
        NodeId(n)
    }

    fn route(dest: u32, hops: &[u32]) -> Route {
        Route::with_hops(id(dest), hops.iter().copied().map(NodeId).collect())
    }

    /// Node 10 with provider 1, peer 2, customers 3 and 4.
    fn speaker() -> Speaker {
        let graph = AsGraph::from_edges([
            (1, 10, Relation::Provider),
            (2, 10, Relation::Peer),
            (10, 3, Relation::Provider),
            (10, 4, Relation::Provider),
        ])
        .unwrap();
        Speaker::new(graph.node(id(10)).unwrap().clone())
    }

    fn drain(s: &Speaker) {
        while s.process_one().unwrap() {}
    }

    #[test]
    fn empty_queue_is_a_noop() {
        let s = speaker();
        assert!(!s.process_one().unwrap());
        assert!(!s.has_dirty());
    }

    #[test]
    fn relation_classes() {
        let s = speaker();
        assert_eq!(s.relation_class(id(10)).unwrap(), RouteClass::Origin);
        assert_eq!(s.relation_class(id(1)).unwrap(), RouteClass::Provider);
        assert_eq!(s.relation_class(id(2)).unwrap(), RouteClass::Peer);
        assert_eq!(s.relation_class(id(3)).unwrap(), RouteClass::Customer);
        assert!(matches!(
            s.relation_class(id(77)),
            Err(BgpError::NotANeighbor { .. })
        ));
    }

    #[test]
    fn origination_installs_self_route() {
        let s = speaker();
        s.originate();
        drain(&s);
        assert_eq!(s.best_route(id(10)), Some(Route::origin(id(10))));
        assert!(s.has_dirty());
    }

    #[test]
    fn implicit_withdrawal_keeps_one_entry_per_neighbor() {
        let s = speaker();
        s.enqueue(Update::Advertisement(route(50, &[3, 7, 50])));
        s.enqueue(Update::Advertisement(route(50, &[3, 50])));
        drain(&s);

        let candidates = s.all_candidates(id(50));
        assert_eq!(candidates, vec![route(50, &[3, 50])]);
        assert_eq!(s.received_route(id(3), id(50)), Some(route(50, &[3, 50])));
        assert_eq!(s.best_route(id(50)), Some(route(50, &[3, 50])));
    }

    #[test]
    fn looped_advertisement_is_rejected_but_still_replaces() {
        let s = speaker();
        s.enqueue(Update::Advertisement(route(50, &[1, 50])));
        drain(&s);
        assert!(s.best_route(id(50)).is_some());

        // Same neighbor now offers a path through us: old entry goes, new one is dropped
        s.enqueue(Update::Advertisement(route(50, &[1, 10, 50])));
        drain(&s);
        assert!(s.all_candidates(id(50)).is_empty());
        assert!(s.best_route(id(50)).is_none());
    }

    #[test]
    fn withdrawal_removes_candidate() {
        let s = speaker();
        s.enqueue(Update::Advertisement(route(50, &[1, 50])));
        s.enqueue(Update::Advertisement(route(50, &[2, 50])));
        drain(&s);
        assert_eq!(s.best_route(id(50)).unwrap().next_hop(), id(2));

        s.enqueue(Update::Withdrawal {
            destination: id(50),
            from: id(2),
        });
        drain(&s);
        assert_eq!(s.best_route(id(50)).unwrap().next_hop(), id(1));
        assert_eq!(s.all_candidates(id(50)).len(), 1);
    }

    #[test]
    fn withdrawal_for_unknown_route_is_harmless() {
        let s = speaker();
        s.enqueue(Update::Withdrawal {
            destination: id(50),
            from: id(1),
        });
        drain(&s);
        assert!(s.best_route(id(50)).is_none());
        assert!(!s.has_dirty());
    }

    #[test]
    fn unchanged_best_does_not_mark_dirty() {
        let s = speaker();
        let sink = RecordingSink::default();
        s.enqueue(Update::Advertisement(route(50, &[3, 50])));
        drain(&s);
        s.release_pending(&sink).unwrap();

        // A worse candidate arrives; the winner stays the same
        s.enqueue(Update::Advertisement(route(50, &[1, 50])));
        drain(&s);
        assert!(!s.has_dirty());
    }

    #[test]
    fn own_prefix_goes_to_everyone() {
        let s = speaker();
        let sink = RecordingSink::default();
        s.originate();
        drain(&s);
        let sent = s.release_pending(&sink).unwrap();

        let sent_to: BTreeSet<_> = sink.take().into_iter().map(|(to, _)| to).collect();
        assert_eq!(sent, 4);
        assert_eq!(sent_to, [1, 2, 3, 4].into_iter().map(NodeId).collect());
        assert!(!s.has_dirty());
        assert_eq!(s.advertised_to(id(10)).len(), 4);
    }

    #[test]
    fn customer_route_is_exported_upstream() {
        let s = speaker();
        let sink = RecordingSink::default();
        s.enqueue(Update::Advertisement(route(50, &[3, 50])));
        drain(&s);
        s.release_pending(&sink).unwrap();

        let updates = sink.take();
        let sent_to: BTreeSet<_> = updates.iter().map(|(to, _)| *to).collect();
        // Customer 3 gets its own route back too; its loop check drops it
        assert_eq!(sent_to, [1, 2, 3, 4].into_iter().map(NodeId).collect());
        for (_, update) in updates {
            assert_eq!(update, Update::Advertisement(route(50, &[10, 3, 50])));
        }
    }

    #[test]
    fn peer_and_provider_routes_stay_downstream() {
        let s = speaker();
        let sink = RecordingSink::default();
        s.enqueue(Update::Advertisement(route(50, &[2, 50])));
        s.enqueue(Update::Advertisement(route(60, &[1, 60])));
        drain(&s);
        s.release_pending(&sink).unwrap();

        for (to, _) in sink.take() {
            assert!(
                s.node().customers().contains(&to),
                "peer/provider route leaked to {to}"
            );
        }
    }

    #[test]
    fn shrinking_export_set_sends_withdrawals() {
        let s = speaker();
        let sink = RecordingSink::default();

        // Customer-learned: exported to all four neighbors
        s.enqueue(Update::Advertisement(route(50, &[3, 50])));
        drain(&s);
        s.release_pending(&sink).unwrap();
        sink.take();

        // Customer withdraws, peer route remains: only customers may hear it
        s.enqueue(Update::Advertisement(route(50, &[2, 50])));
        s.enqueue(Update::Withdrawal {
            destination: id(50),
            from: id(3),
        });
        drain(&s);
        s.release_pending(&sink).unwrap();

        let updates = sink.take();
        let withdrawn: BTreeSet<_> = updates
            .iter()
            .filter(|(_, u)| u.is_withdrawal())
            .map(|(to, _)| *to)
            .collect();
        assert_eq!(withdrawn, [1, 2].into_iter().map(NodeId).collect());
        assert_eq!(s.advertised_to(id(50)), [3, 4].into_iter().map(NodeId).collect());
    }

    #[test]
    fn losing_every_route_withdraws_from_all() {
        let s = speaker();
        let sink = RecordingSink::default();
        s.enqueue(Update::Advertisement(route(50, &[3, 50])));
        drain(&s);
        s.release_pending(&sink).unwrap();
        sink.take();

        s.enqueue(Update::Withdrawal {
            destination: id(50),
            from: id(3),
        });
        drain(&s);
        assert!(s.has_dirty());
        s.release_pending(&sink).unwrap();

        let updates = sink.take();
        assert_eq!(updates.len(), 4);
        assert!(updates.iter().all(|(_, u)| u.is_withdrawal()));
        assert!(s.advertised_to(id(50)).is_empty());
    }

    #[test]
    fn marking_guards_privileged_nodes() {
        let s = speaker();
        s.mark().unwrap();
        assert!(s.is_marked());
        s.reset_mark();
        assert!(!s.is_marked());

        let mut graph = AsGraph::from_edges([(1, 2, Relation::Peer)]).unwrap();
        graph.mark_privileged(id(1)).unwrap();
        let warden = Speaker::new(graph.node(id(1)).unwrap().clone());
        assert!(matches!(warden.mark(), Err(BgpError::MarkPrivileged(_))));
        assert!(!warden.is_marked());
    }
}
