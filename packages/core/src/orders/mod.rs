//! Ordered Lists
//!
//! Persistent doubly linked lists whose nodes are statements in a
//! [`GraphStore`](crate::db::GraphStore):
//!
//! - [`NodeCache`] - session-scoped arena of materialized nodes and targets
//! - [`ListNode`] - one position: target, container and neighbor identities
//! - [`OrderedList`] - position-addressed link surgery over one session
//! - [`ListSource`] - container record holding the authoritative head/tail
//! - [`OrderedAggregation`] - ordered facade kept coherent with an unordered
//!   membership association on the owner
//! - [`repair`](repair::repair) - idempotent fix-up after interrupted writes

mod association;
mod error;
mod list_node;
mod list_source;
mod node_cache;
mod ordered_list;
pub mod repair;

#[cfg(test)]
mod ordered_list_test;

pub use association::{ElementState, OrderedAggregation};
pub use error::{LinkDirection, OrderError};
pub use list_node::{resolve_next, resolve_prev, resolve_target, AutosaveState, ListNode};
pub use list_source::{ListSource, LIST_SOURCE_TYPE};
pub use node_cache::NodeCache;
pub use ordered_list::OrderedList;
pub use repair::{repair, RepairReport};
