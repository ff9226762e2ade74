//! Best-route selection.
//!
//! Candidates are ranked by, in order:
//!
//! 1. relationship class of the next hop: origin > customer > peer > provider
//! 2. shorter hop count
//! 3. numerically smaller next-hop identity
//!
//! The ranking is a pure function of the candidate set. Arrival order never
//! changes the winner.

use std::cmp::Reverse;

use nightwing_topology::{NodeId, Relation};
use serde::{Deserialize, Serialize};

use crate::{Result, Route};

/// Relationship class of a route's next hop, least preferred first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    /// Learned from a provider.
    Provider,
    /// Learned from a peer.
    Peer,
    /// Learned from a customer.
    Customer,
    /// The speaker's own route to itself.
    Origin,
}

impl RouteClass {
    /// Class for a neighbor playing `role` toward the speaker.
    pub fn from_role(role: Relation) -> Option<Self> {
        match role {
            Relation::Provider => Some(RouteClass::Provider),
            Relation::Peer => Some(RouteClass::Peer),
            Relation::Customer => Some(RouteClass::Customer),
            Relation::Ignore => None,
        }
    }

    /// Whether a route of this class may be exported to peers and providers.
    pub fn exports_upstream(self) -> bool {
        matches!(self, RouteClass::Origin | RouteClass::Customer)
    }
}

/// Sort key where the smallest key is the most preferred route.
type Preference = (Reverse<RouteClass>, usize, NodeId);

fn preference(class: RouteClass, route: &Route) -> Preference {
    (Reverse(class), route.len(), route.next_hop())
}

/// Pick the most preferred route among `candidates`.
///
/// `classify` maps a next hop to its relationship class; an error from it
/// aborts selection. Returns `None` for an empty candidate set.
pub fn select_best<'a, I, F>(candidates: I, mut classify: F) -> Result<Option<&'a Route>>
where
    I: IntoIterator<Item = &'a Route>,
    F: FnMut(NodeId) -> Result<RouteClass>,
{
    let mut best: Option<(Preference, &'a Route)> = None;
    for route in candidates {
        let key = preference(classify(route.next_hop())?, route);
        let better = match &best {
            Some((current, _)) => key < *current,
            None => true,
        };
        if better {
            best = Some((key, route));
        }
    }
    Ok(best.map(|(_, route)| route))
}
