//! Error types for ordered lists and their associations
//!
//! Argument errors (type mismatch, missing membership, bad positions) are
//! raised before anything is written. Retrieval errors (dangling links,
//! missing records) surface as soon as traversal hits them. Store failures
//! pass through unchanged.

use crate::models::Identity;
use std::fmt;
use thiserror::Error;

/// Which pointer a dangling link was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    Head,
    Tail,
    Next,
    Prev,
}

impl fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkDirection::Head => "head",
            LinkDirection::Tail => "tail",
            LinkDirection::Next => "next",
            LinkDirection::Prev => "prev",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while reading or mutating an ordered list
#[derive(Error, Debug)]
pub enum OrderError {
    /// Record fails the association's type check or filter predicate
    #[error("Record '{record_id}' of type '{record_type}' is not accepted by '{association}'")]
    TypeMismatch {
        association: String,
        record_id: Identity,
        record_type: String,
    },

    /// Ordering an identity that is not an unordered member
    #[error("'{id}' is not a part of {association}")]
    NotAMember { id: Identity, association: String },

    /// Blank identity passed where a record identity is required
    #[error("ID can not be empty")]
    EmptyIdentity,

    /// Position beyond the current list bounds
    #[error("Position {position} is out of range for list of length {len}")]
    PositionOutOfRange { position: usize, len: usize },

    /// A recorded link points at a node whose statements are missing
    ///
    /// Never treated as end-of-list: doing so would silently truncate the order.
    #[error("Dangling {direction} link from '{from}' to '{to}': node statements are missing")]
    DanglingLink {
        from: Identity,
        to: Identity,
        direction: LinkDirection,
    },

    /// Following `next` links revisited a node
    #[error("Cycle detected in ordered list at node '{node}'")]
    CycleDetected { node: Identity },

    /// A value handed to `replace` is not a well-formed ordered list
    #[error("Malformed ordered list: {reason}")]
    MalformedList { reason: String },

    /// Referenced record does not exist in the record store
    #[error("Record not found: {id}")]
    RecordNotFound { id: Identity },

    /// Node identity is not part of the current traversal session
    #[error("List node '{id}' is not loaded in this session")]
    NodeNotLoaded { id: Identity },

    /// Association definition failed validation
    #[error("Invalid association configuration: {0}")]
    InvalidConfig(String),

    /// Store operation failed
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl OrderError {
    pub fn type_mismatch(
        association: impl Into<String>,
        record_id: Identity,
        record_type: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            association: association.into(),
            record_id,
            record_type: record_type.into(),
        }
    }

    pub fn not_a_member(id: Identity, association: impl Into<String>) -> Self {
        Self::NotAMember {
            id,
            association: association.into(),
        }
    }

    pub fn out_of_range(position: usize, len: usize) -> Self {
        Self::PositionOutOfRange { position, len }
    }

    pub fn dangling(from: Identity, to: Identity, direction: LinkDirection) -> Self {
        Self::DanglingLink {
            from,
            to,
            direction,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedList {
            reason: reason.into(),
        }
    }

    pub fn record_not_found(id: Identity) -> Self {
        Self::RecordNotFound { id }
    }

    pub fn node_not_loaded(id: Identity) -> Self {
        Self::NodeNotLoaded { id }
    }

    /// True for caller mistakes that are rejected before any write
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. }
                | Self::NotAMember { .. }
                | Self::EmptyIdentity
                | Self::PositionOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_member_message() {
        let err = OrderError::not_a_member(Identity::new("page-9"), "members");
        assert_eq!(err.to_string(), "'page-9' is not a part of members");
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_dangling_link_message() {
        let err = OrderError::dangling(
            Identity::new("n1"),
            Identity::new("n2"),
            LinkDirection::Next,
        );
        assert_eq!(
            err.to_string(),
            "Dangling next link from 'n1' to 'n2': node statements are missing"
        );
        assert!(!err.is_argument_error());
    }

    #[test]
    fn test_out_of_range_message() {
        let err = OrderError::out_of_range(5, 2);
        assert_eq!(
            err.to_string(),
            "Position 5 is out of range for list of length 2"
        );
        assert!(err.is_argument_error());
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: OrderError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "disk full");
        assert!(!err.is_argument_error());
    }
}
