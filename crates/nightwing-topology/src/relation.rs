//! Business relationships between autonomous systems.
//!
//! A relationship is always stated from one side: `Relation::Provider` on the
//! edge (A, B) means "A is a provider of B", so B sees A as a provider and A
//! sees B as a customer. The mirror is installed on both nodes together.
//!
//! # File Codes
//!
//! Relationship records carry an integer code from the left node's view:
//!
//! | Code | Meaning |
//! |------|---------|
//! | `-1` | left is provider of right |
//! | `0`  | left and right are peers |
//! | `1`  | left is customer of right |
//! | `3`  | ignored (no structural effect) |
//!
//! Any other code is a configuration error.

use crate::{Result, TopologyError};

/// File code for "left is provider of right".
pub const CODE_PROVIDER: i32 = -1;
/// File code for a peering edge.
pub const CODE_PEER: i32 = 0;
/// File code for "left is customer of right".
pub const CODE_CUSTOMER: i32 = 1;
/// File code the model skips.
pub const CODE_IGNORE: i32 = 3;

/// The role a node plays toward another node on an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Relation {
    /// This node sells transit to the other.
    Provider,
    /// Settlement-free exchange of customer routes.
    Peer,
    /// This node buys transit from the other.
    Customer,
    /// Accepted but not represented.
    Ignore,
}

impl Relation {
    /// Decode a relationship-file code.
    ///
    /// `line` is only used for error reporting.
    pub fn from_code(code: i32, line: usize) -> Result<Self> {
        match code {
            CODE_PROVIDER => Ok(Relation::Provider),
            CODE_PEER => Ok(Relation::Peer),
            CODE_CUSTOMER => Ok(Relation::Customer),
            CODE_IGNORE => Ok(Relation::Ignore),
            other => Err(TopologyError::UnknownRelation { line, code: other }),
        }
    }

    /// The same edge seen from the other endpoint.
    pub const fn mirror(self) -> Self {
        match self {
            Relation::Provider => Relation::Customer,
            Relation::Customer => Relation::Provider,
            Relation::Peer => Relation::Peer,
            Relation::Ignore => Relation::Ignore,
        }
    }

    /// The file code for this relation.
    pub const fn code(self) -> i32 {
        match self {
            Relation::Provider => CODE_PROVIDER,
            Relation::Peer => CODE_PEER,
            Relation::Customer => CODE_CUSTOMER,
            Relation::Ignore => CODE_IGNORE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_decode() {
        assert_eq!(Relation::from_code(-1, 1).unwrap(), Relation::Provider);
        assert_eq!(Relation::from_code(0, 1).unwrap(), Relation::Peer);
        assert_eq!(Relation::from_code(1, 1).unwrap(), Relation::Customer);
        assert_eq!(Relation::from_code(3, 1).unwrap(), Relation::Ignore);
    }

    #[test]
    fn unknown_code_is_rejected() {
        // Siblings (2) are not part of the model
        let err = Relation::from_code(2, 17).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::UnknownRelation { line: 17, code: 2 }
        ));
    }

    #[test]
    fn mirror_is_an_involution() {
        for rel in [
            Relation::Provider,
            Relation::Peer,
            Relation::Customer,
            Relation::Ignore,
        ] {
            assert_eq!(rel.mirror().mirror(), rel);
            assert_eq!(Relation::from_code(rel.code(), 0).unwrap(), rel);
        }
    }
}
