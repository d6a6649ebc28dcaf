//! Store Traits - Persistence Abstraction Layer
//!
//! This module defines the two narrow collaborators the ordered list core
//! consumes:
//!
//! - [`GraphStore`]: statements about list nodes (`proxy_for`, `proxy_in`, `next`, `prev`)
//! - [`RecordStore`]: load/save of whole records (elements, owners, list sources)
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded (libsql) and in-memory
//!    backends share one interface
//! 2. **Missing is not an error**: `get_statements`/`load` return `Ok(None)` for
//!    unknown subjects; callers decide whether absence is fatal (a dangling link is)
//! 3. **Error Handling**: Uses `anyhow::Result` for flexible error context
//! 4. **No transactions**: Each call is atomic on its own; multi-step relinks are not
//!
//! # Examples
//!
//! ```rust,no_run
//! use strand_core::db::{GraphStore, MemoryStore, ProxyStatements};
//! use strand_core::models::Identity;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! let node = Identity::new("book-1/list_source#a");
//! store
//!     .put_statements(
//!         &node,
//!         ProxyStatements {
//!             proxy_for: Some(Identity::new("page-1")),
//!             proxy_in: Some(Identity::new("book-1")),
//!             next: None,
//!             prev: None,
//!         },
//!     )
//!     .await?;
//! assert!(store.get_statements(&node).await?.is_some());
//! # Ok(())
//! # }
//! ```

use crate::models::{Identity, Record};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Predicate URIs used when list node statements are stored as triples
pub mod vocab {
    /// ORE: the element a proxy stands for
    pub const PROXY_FOR: &str = "http://www.openarchives.org/ore/terms/proxyFor";
    /// ORE: the aggregation a proxy belongs to
    pub const PROXY_IN: &str = "http://www.openarchives.org/ore/terms/proxyIn";
    /// IANA link relation: following node
    pub const NEXT: &str = "http://www.iana.org/assignments/relation/next";
    /// IANA link relation: preceding node
    pub const PREV: &str = "http://www.iana.org/assignments/relation/prev";
}

/// Graph projection of one list node
///
/// This is the unit written to and read from the [`GraphStore`]. Absent links
/// mean "at the boundary" (the head has no `prev`, the tail has no `next`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyStatements {
    /// Identity of the wrapped element
    pub proxy_for: Option<Identity>,

    /// Identity of the owning collection record
    pub proxy_in: Option<Identity>,

    /// Identity of the following node
    pub next: Option<Identity>,

    /// Identity of the preceding node
    pub prev: Option<Identity>,
}

impl ProxyStatements {
    /// Flatten into `(predicate, object)` pairs for triple-oriented backends
    pub fn to_pairs(&self) -> Vec<(&'static str, &Identity)> {
        [
            (vocab::PROXY_FOR, self.proxy_for.as_ref()),
            (vocab::PROXY_IN, self.proxy_in.as_ref()),
            (vocab::NEXT, self.next.as_ref()),
            (vocab::PREV, self.prev.as_ref()),
        ]
        .into_iter()
        .filter_map(|(predicate, object)| object.map(|o| (predicate, o)))
        .collect()
    }

    /// Rebuild from `(predicate, object)` pairs, ignoring unknown predicates
    ///
    /// Repeated predicates keep the first object seen.
    pub fn from_pairs<I, P, O>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, O)>,
        P: AsRef<str>,
        O: Into<Identity>,
    {
        let mut statements = Self::default();
        for (predicate, object) in pairs {
            let slot = match predicate.as_ref() {
                vocab::PROXY_FOR => &mut statements.proxy_for,
                vocab::PROXY_IN => &mut statements.proxy_in,
                vocab::NEXT => &mut statements.next,
                vocab::PREV => &mut statements.prev,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(object.into());
            }
        }
        statements
    }
}

/// Statement-level access to list nodes in the graph store
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the store is trusted to serialize
/// concurrent writers to the same subject.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Fetch the statements recorded for a node
    ///
    /// # Returns
    ///
    /// - `Ok(Some(statements))` if the subject has any statements
    /// - `Ok(None)` if nothing is recorded (not an error at this layer)
    async fn get_statements(&self, subject: &Identity) -> Result<Option<ProxyStatements>>;

    /// Replace every statement about `subject` with `statements`
    async fn put_statements(&self, subject: &Identity, statements: ProxyStatements) -> Result<()>;

    /// Remove every statement about `subject`, returning whether anything existed
    async fn delete_statements(&self, subject: &Identity) -> Result<bool>;

    /// All node subjects whose `proxy_in` is `container`
    async fn subjects_in(&self, container: &Identity) -> Result<Vec<Identity>>;

    /// All node subjects whose `proxy_for` is `target`
    async fn subjects_for(&self, target: &Identity) -> Result<Vec<Identity>>;
}

/// Object persistence for records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a record by identity (`Ok(None)` if unknown)
    async fn load(&self, id: &Identity) -> Result<Option<Record>>;

    /// Persist a record and return the stored copy (version bumped)
    async fn save(&self, record: &Record) -> Result<Record>;

    /// Delete a record, returning whether it existed
    async fn delete(&self, id: &Identity) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_skip_absent_links() {
        let statements = ProxyStatements {
            proxy_for: Some(Identity::new("page-1")),
            proxy_in: Some(Identity::new("book-1")),
            next: None,
            prev: Some(Identity::new("n0")),
        };

        let pairs = statements.to_pairs();
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|(p, _)| *p != vocab::NEXT));
    }

    #[test]
    fn test_from_pairs_ignores_unknown_predicates() {
        let statements = ProxyStatements::from_pairs(vec![
            (vocab::PROXY_FOR, "page-1"),
            ("http://example.org/other", "x"),
            (vocab::NEXT, "n2"),
            (vocab::NEXT, "n3"),
        ]);

        assert_eq!(statements.proxy_for, Some(Identity::new("page-1")));
        assert_eq!(statements.next, Some(Identity::new("n2")), "first object wins");
        assert!(statements.prev.is_none());
        assert!(statements.proxy_in.is_none());
    }

    #[test]
    fn test_statements_json_contract() {
        let statements = ProxyStatements {
            proxy_for: Some(Identity::new("page-1")),
            proxy_in: None,
            next: None,
            prev: None,
        };

        let json = serde_json::to_value(&statements).unwrap();
        assert_eq!(json["proxyFor"], "page-1");
        assert!(json["proxyIn"].is_null());
    }
}
