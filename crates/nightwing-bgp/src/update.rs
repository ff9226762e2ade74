//! Update messages exchanged between speakers.

use nightwing_topology::NodeId;

use crate::{Result, Route};

/// A single BGP-style update.
///
/// Created by one speaker's export step, consumed by the receiver's
/// processing step, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// A new (or replacement) route. The sender is the route's next hop.
    Advertisement(Route),
    /// The sender no longer offers any route to `destination`.
    Withdrawal { destination: NodeId, from: NodeId },
}

impl Update {
    /// The neighbor that sent this update.
    pub fn sender(&self) -> NodeId {
        match self {
            Update::Advertisement(route) => route.next_hop(),
            Update::Withdrawal { from, .. } => *from,
        }
    }

    /// The destination this update is about.
    pub fn destination(&self) -> NodeId {
        match self {
            Update::Advertisement(route) => route.destination(),
            Update::Withdrawal { destination, .. } => *destination,
        }
    }

    pub fn is_withdrawal(&self) -> bool {
        matches!(self, Update::Withdrawal { .. })
    }
}

/// Where a speaker's export step sends its updates.
///
/// Implementations must accept concurrent calls from several speakers.
pub trait UpdateSink: Sync {
    /// Enqueue `update` on the inbound queue of `to`.
    fn deliver(&self, to: NodeId, update: Update) -> Result<()>;
}
