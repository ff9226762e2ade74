//! Autonomous system identity.

use std::fmt;
use std::str::FromStr;

/// Unique integer identity of an autonomous system (a protocol speaker).
///
/// Ordering is numeric, which is what the route selection tie-break relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new identity.
    pub const fn new(asn: u32) -> Self {
        Self(asn)
    }

    /// The raw AS number.
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(asn: u32) -> Self {
        Self(asn)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
