//! Unordered Aggregations
//!
//! - [`MembershipAssociation`] - named unordered member set on an owner record
//! - [`FilteredAssociation`] - predicate-filtered view over a membership set
//! - [`ordered_by`] - owners whose order contains an element

mod filter;
mod membership;
mod reverse;

pub use filter::{FilteredAssociation, RecordPredicate};
pub use membership::MembershipAssociation;
pub use reverse::{is_ordered_by, ordered_by};
