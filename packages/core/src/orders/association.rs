//! Ordered Aggregation - ordered facade over an unordered membership set
//!
//! `OrderedAggregation` binds an [`OrderedList`] to an owner record. It keeps
//! the owner's unordered membership association a superset of the ordered
//! targets (an element is always made a member before it is linked) and keeps
//! the head/tail summary on the list source and the owner current after each
//! structural change.
//!
//! # Persistence
//!
//! Every mutating call validates its arguments first, then mutates in memory
//! and flushes:
//!
//! 1. touched nodes (target, then projection) in touch order
//! 2. removed nodes' statements
//! 3. the list source, if its head/tail moved
//! 4. the owner, if the list source saved cleanly and the owner's copy of
//!    head/tail is stale
//!
//! The steps are not atomic; [`repair`](super::repair) closes the window.
//!
//! # Examples
//!
//! ```rust
//! use strand_core::config::OrderedAggregationConfig;
//! use strand_core::db::{MemoryStore, RecordStore};
//! use strand_core::models::{Identity, Record};
//! use strand_core::orders::OrderedAggregation;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let book = Record::new_with_id(Identity::new("book-1"), "book".to_string(), json!({}));
//! store.save(&book).await?;
//!
//! let mut pages = OrderedAggregation::load(
//!     OrderedAggregationConfig::default(),
//!     &book.id,
//!     store.clone(),
//!     store.clone(),
//! )
//! .await?;
//!
//! let page = Record::new("page".to_string(), json!({ "title": "One" }));
//! pages.append_target(page.clone()).await?;
//! assert_eq!(pages.target_ids().await?, vec![page.id]);
//! # Ok(())
//! # }
//! ```

use crate::aggregation::MembershipAssociation;
use crate::config::OrderedAggregationConfig;
use crate::db::{GraphStore, RecordStore};
use crate::models::{Identity, Record};
use crate::orders::error::OrderError;
use crate::orders::list_node::ListNode;
use crate::orders::list_source::ListSource;
use crate::orders::ordered_list::OrderedList;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where an element stands relative to an aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    /// Neither a member nor ordered
    Absent,
    /// Unordered member only
    Member,
    /// Member and linked into the order
    Ordered,
}

/// Ordered aggregation bound to one owner record
pub struct OrderedAggregation {
    config: OrderedAggregationConfig,
    owner: Record,
    source: ListSource,
    membership: MembershipAssociation,
    /// Materialized order, dropped by `replace` and `reload`
    list: Option<OrderedList>,
    graph: Arc<dyn GraphStore>,
    records: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for OrderedAggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedAggregation")
            .field("name", &self.config.name)
            .field("owner", &self.owner.id)
            .field("source", self.source.id())
            .field("list", &self.list)
            .finish()
    }
}

impl OrderedAggregation {
    /// Load the owner and its list source from the record store
    pub async fn load(
        config: OrderedAggregationConfig,
        owner: &Identity,
        graph: Arc<dyn GraphStore>,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, OrderError> {
        let record = records
            .load(owner)
            .await?
            .ok_or_else(|| OrderError::record_not_found(owner.clone()))?;
        Self::attach(config, record, graph, records).await
    }

    /// Bind to an owner record already in hand
    pub async fn attach(
        config: OrderedAggregationConfig,
        owner: Record,
        graph: Arc<dyn GraphStore>,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, OrderError> {
        config.validate().map_err(OrderError::InvalidConfig)?;

        let source =
            ListSource::load_or_new(records.as_ref(), &owner.id, &config.list_source_segment)
                .await?;
        let membership = MembershipAssociation::new(config.unordered.clone(), records.clone());

        tracing::debug!(
            "Attached ordered aggregation '{}' to {} (list source {})",
            config.name,
            owner.id,
            source.id()
        );

        Ok(Self {
            config,
            owner,
            source,
            membership,
            list: None,
            graph,
            records,
        })
    }

    pub fn config(&self) -> &OrderedAggregationConfig {
        &self.config
    }

    pub fn owner(&self) -> &Record {
        &self.owner
    }

    pub fn list_source(&self) -> &ListSource {
        &self.source
    }

    pub fn membership(&self) -> &MembershipAssociation {
        &self.membership
    }

    /// The materialized order, opened from the list source on first use
    pub fn list(&mut self) -> &mut OrderedList {
        let source = &self.source;
        let graph = &self.graph;
        let records = &self.records;
        self.list.get_or_insert_with(|| {
            OrderedList::load(
                source.id().clone(),
                source.head().cloned(),
                source.tail().cloned(),
                graph.clone(),
                records.clone(),
            )
        })
    }

    /// Empty list in this aggregation's container, for building a replacement
    pub fn new_list(&self) -> OrderedList {
        OrderedList::detached(
            self.source.id().clone(),
            self.graph.clone(),
            self.records.clone(),
        )
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Ordered targets
    pub async fn targets(&mut self) -> Result<Vec<Record>, OrderError> {
        self.list().targets().await
    }

    /// Alias of [`targets`](Self::targets)
    pub async fn reader(&mut self) -> Result<Vec<Record>, OrderError> {
        self.targets().await
    }

    pub async fn target_ids(&mut self) -> Result<Vec<Identity>, OrderError> {
        self.list().target_ids().await
    }

    pub async fn len(&mut self) -> Result<usize, OrderError> {
        self.list().len().await
    }

    pub fn is_empty(&mut self) -> bool {
        self.list().is_empty()
    }

    /// Unordered membership check
    pub fn is_member(&self, id: &Identity) -> bool {
        self.membership.contains(&self.owner, id)
    }

    pub async fn is_ordered(&mut self, id: &Identity) -> Result<bool, OrderError> {
        Ok(self.target_ids().await?.contains(id))
    }

    pub async fn state_of(&mut self, id: &Identity) -> Result<ElementState, OrderError> {
        if !self.is_member(id) {
            return Ok(ElementState::Absent);
        }
        if self.is_ordered(id).await? {
            Ok(ElementState::Ordered)
        } else {
            Ok(ElementState::Member)
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn check_type(&self, record: &Record) -> Result<(), OrderError> {
        if self.config.accepts_type(&record.record_type) {
            Ok(())
        } else {
            Err(OrderError::type_mismatch(
                self.config.name.clone(),
                record.id.clone(),
                record.record_type.clone(),
            ))
        }
    }

    /// Make `record` an unordered member, returning the stored copy
    async fn ensure_member(&mut self, record: Record) -> Result<Record, OrderError> {
        let id = record.id.clone();
        let mut stored = self.membership.concat(&mut self.owner, vec![record]).await?;
        stored.pop().ok_or_else(|| OrderError::record_not_found(id))
    }

    /// Append `record`, adding it to the membership set first if needed
    pub async fn append_target(&mut self, record: Record) -> Result<Identity, OrderError> {
        self.check_type(&record)?;
        let record = self.ensure_member(record).await?;
        let node = self.list().append_target(record).await?;
        self.persist().await?;
        Ok(node)
    }

    /// Insert `record` at `position`, adding it to the membership set first
    pub async fn insert_target_at(
        &mut self,
        position: usize,
        record: Record,
    ) -> Result<Identity, OrderError> {
        self.check_type(&record)?;
        let len = self.len().await?;
        if position > len {
            return Err(OrderError::out_of_range(position, len));
        }

        let record = self.ensure_member(record).await?;
        let node = self.list().insert_at(position, record).await?;
        self.persist().await?;
        Ok(node)
    }

    /// Insert an existing member by identity
    ///
    /// Fails with `NotAMember` rather than fabricating order over an element
    /// the owner does not hold.
    pub async fn insert_target_id_at(
        &mut self,
        position: usize,
        id: &Identity,
    ) -> Result<Identity, OrderError> {
        if id.is_empty() {
            return Err(OrderError::EmptyIdentity);
        }
        if !self.is_member(id) {
            return Err(OrderError::not_a_member(
                id.clone(),
                self.config.unordered.clone(),
            ));
        }

        let node = self.list().insert_proxy_for_at(position, id.clone()).await?;
        self.persist().await?;
        Ok(node)
    }

    /// Remove the node at `position`; membership is untouched
    pub async fn delete_at(&mut self, position: usize) -> Result<ListNode, OrderError> {
        let node = self.list().delete_at(position).await?;
        self.persist().await?;
        tracing::debug!("Deleted position {} from '{}'", position, self.config.name);
        Ok(node)
    }

    /// Remove the first occurrence of `target` from the order
    pub async fn delete_target(&mut self, target: &Identity) -> Result<bool, OrderError> {
        let deleted = self.list().delete_target(target).await?;
        if deleted {
            self.persist().await?;
        }
        Ok(deleted)
    }

    /// Remove every occurrence of `target` from the order
    pub async fn delete_target_all(&mut self, target: &Identity) -> Result<usize, OrderError> {
        let deleted = self.list().delete_target_all(target).await?;
        if deleted > 0 {
            self.persist().await?;
        }
        Ok(deleted)
    }

    /// Remove a node of this order by its identity
    pub async fn delete_record(&mut self, node: &Identity) -> Result<bool, OrderError> {
        self.delete_records(std::slice::from_ref(node))
            .await
            .map(|n| n > 0)
    }

    pub async fn delete_records(&mut self, nodes: &[Identity]) -> Result<usize, OrderError> {
        let mut deleted = 0;
        for node in nodes {
            if self.list().delete_node(node).await? {
                deleted += 1;
            }
        }
        if deleted > 0 {
            self.persist().await?;
        }
        Ok(deleted)
    }

    /// Remove every node; membership is untouched
    pub async fn clear(&mut self) -> Result<usize, OrderError> {
        let cleared = self.list().clear().await?;
        self.persist().await?;
        Ok(cleared)
    }

    /// Take an element out of the order and out of the membership set
    pub async fn remove_member(&mut self, id: &Identity) -> Result<bool, OrderError> {
        self.delete_target_all(id).await?;
        let removed = self
            .membership
            .delete(&mut self.owner, std::slice::from_ref(id))
            .await?;
        Ok(removed > 0)
    }

    /// Set the order to exactly `records`
    pub async fn target_writer(&mut self, records: Vec<Record>) -> Result<(), OrderError> {
        for record in &records {
            self.check_type(record)?;
        }

        self.list().clear().await?;
        for record in records {
            let record = self.ensure_member(record).await?;
            self.list().append_target(record).await?;
        }
        self.persist().await
    }

    /// Substitute the whole chain with the order held by `replacement`
    ///
    /// `replacement` must be a well-formed list in this aggregation's
    /// container; anything else is rejected with `MalformedList` before any
    /// write. Targets known only by identity must already be members.
    pub async fn replace(&mut self, mut replacement: OrderedList) -> Result<(), OrderError> {
        if replacement.container() != self.source.id() {
            return Err(OrderError::malformed(format!(
                "list belongs to '{}', not '{}'",
                replacement.container(),
                self.source.id()
            )));
        }
        replacement.validate().await.map_err(|e| match e {
            OrderError::MalformedList { .. } | OrderError::Store(_) => e,
            other => OrderError::malformed(other.to_string()),
        })?;

        let entries = replacement.entries().await?;
        for (_, proxy_for, target) in &entries {
            match (proxy_for, target) {
                (_, Some(record)) => self.check_type(record)?,
                (Some(id), None) if !self.is_member(id) => {
                    return Err(OrderError::not_a_member(
                        id.clone(),
                        self.config.unordered.clone(),
                    ));
                }
                _ => {}
            }
        }

        self.list().clear().await?;
        for (_, proxy_for, target) in entries {
            match (proxy_for, target) {
                (_, Some(record)) => {
                    let record = self.ensure_member(record).await?;
                    self.list().append_target(record).await?;
                }
                (Some(id), None) => {
                    self.list().append_proxy_for(id).await?;
                }
                (None, None) => {}
            }
        }
        self.persist().await?;

        self.list = None;
        tracing::debug!("Replaced order of '{}' on {}", self.config.name, self.owner.id);
        Ok(())
    }

    /// Drop the materialized order and re-read owner and list source
    pub async fn reload(&mut self) -> Result<(), OrderError> {
        self.owner = self
            .records
            .load(&self.owner.id)
            .await?
            .ok_or_else(|| OrderError::record_not_found(self.owner.id.clone()))?;
        self.source = ListSource::load_or_new(
            self.records.as_ref(),
            &self.owner.id,
            &self.config.list_source_segment,
        )
        .await?;
        self.list = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Persist one node: its target, its projection, then the head/tail summary
    pub async fn insert_record(&mut self, node: &Identity) -> Result<(), OrderError> {
        self.list().save_node(node).await?;
        self.save_summary().await
    }

    /// Flush every pending change of the materialized order
    ///
    /// Touched nodes, then the list source and owner summary, then deletion of
    /// removed nodes, so removed nodes are never deleted while the recorded
    /// head can still reach them.
    pub async fn persist(&mut self) -> Result<(), OrderError> {
        let Some(list) = self.list.as_mut() else {
            return Ok(());
        };
        list.persist_links().await?;
        self.save_summary().await?;
        if let Some(list) = self.list.as_mut() {
            list.purge_removed().await?;
        }
        Ok(())
    }

    async fn save_summary(&mut self) -> Result<(), OrderError> {
        let Some(list) = self.list.as_ref() else {
            return Ok(());
        };
        self.source
            .set_bounds(list.head().cloned(), list.tail().cloned());
        self.source.save(self.records.as_ref()).await?;

        // The owner copy only follows a cleanly saved list source
        if self.source.is_changed() {
            return Ok(());
        }
        let head = self.source.head().cloned();
        let tail = self.source.tail().cloned();
        if self.owner.head != head || self.owner.tail != tail {
            self.owner.head = head;
            self.owner.tail = tail;
            self.owner = self.records.save(&self.owner).await?;
        }
        Ok(())
    }
}
