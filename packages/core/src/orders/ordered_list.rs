//! Ordered List - position-addressed operations over a persisted node chain
//!
//! An `OrderedList` is one traversal/mutation session over the chain that
//! starts at a head identity and ends at a tail identity. Nodes are pulled
//! into the session's [`NodeCache`] one link at a time; list order is decided
//! solely by the persisted `next`/`prev` links.
//!
//! Mutations are link surgery in memory. Every node a mutation touches is
//! recorded in touch order (the new node first, then its neighbors) and every
//! removed node is remembered, so [`OrderedList::persist`] can flush exactly
//! what changed. Writing the new node before the neighbors that point at it,
//! and deleting removed nodes only after the chain ends have been recorded,
//! means an interrupted flush leaves at worst an orphan or a one-sided link,
//! both of which [`repair`](super::repair) restores.

use crate::db::{GraphStore, RecordStore};
use crate::models::{Identity, Record};
use crate::orders::error::{LinkDirection, OrderError};
use crate::orders::list_node::{fetch_node, resolve_next, resolve_target, ListNode};
use crate::orders::node_cache::NodeCache;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// One session over a persisted ordered list
pub struct OrderedList {
    /// List source the nodes live in (`proxy_in` of every node)
    container: Identity,
    head: Option<Identity>,
    tail: Option<Identity>,
    nodes: NodeCache<ListNode>,
    targets: NodeCache<Record>,
    /// Nodes whose projection must be rewritten, in touch order
    touched: Vec<Identity>,
    /// Nodes whose statements must be deleted
    removed: BTreeSet<Identity>,
    graph: Arc<dyn GraphStore>,
    records: Arc<dyn RecordStore>,
}

impl fmt::Debug for OrderedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedList")
            .field("container", &self.container)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("loaded", &self.nodes.len())
            .field("touched", &self.touched)
            .field("removed", &self.removed)
            .finish()
    }
}

impl OrderedList {
    /// Open a session over the chain recorded as `head`..`tail` in `container`
    pub fn load(
        container: Identity,
        head: Option<Identity>,
        tail: Option<Identity>,
        graph: Arc<dyn GraphStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            container,
            head,
            tail,
            nodes: NodeCache::new(),
            targets: NodeCache::new(),
            touched: Vec::new(),
            removed: BTreeSet::new(),
            graph,
            records,
        }
    }

    /// Empty list not yet backed by any statements
    ///
    /// Used to build a replacement order in memory before handing it to
    /// [`OrderedAggregation::replace`](super::OrderedAggregation::replace).
    pub fn detached(
        container: Identity,
        graph: Arc<dyn GraphStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self::load(container, None, None, graph, records)
    }

    pub fn container(&self) -> &Identity {
        &self.container
    }

    pub fn head(&self) -> Option<&Identity> {
        self.head.as_ref()
    }

    pub fn tail(&self) -> Option<&Identity> {
        self.tail.as_ref()
    }

    /// Node already loaded in this session
    pub fn node(&self, id: &Identity) -> Option<&ListNode> {
        self.nodes.get(id)
    }

    /// True if a mutation has not been persisted yet
    pub fn has_changes(&self) -> bool {
        !self.touched.is_empty() || !self.removed.is_empty()
    }

    /// Node cache `(hits, misses)` for this session
    pub fn cache_stats(&self) -> (usize, usize) {
        self.nodes.stats()
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Make sure the head node is in the session and return its identity
    async fn load_head(&mut self) -> Result<Option<Identity>, OrderError> {
        let Some(head) = self.head.clone() else {
            return Ok(None);
        };
        fetch_node(
            &mut self.nodes,
            self.graph.as_ref(),
            &head,
            &self.container,
            LinkDirection::Head,
        )
        .await?;
        Ok(Some(head))
    }

    /// Walk `position` steps from the head
    ///
    /// Returns the node at `position`, or `None` when `position == len`.
    async fn walk_to(&mut self, position: usize) -> Result<Option<Identity>, OrderError> {
        let mut current = self.load_head().await?;
        for step in 0..position {
            let Some(id) = current else {
                return Err(OrderError::out_of_range(position, step));
            };
            current = resolve_next(&mut self.nodes, self.graph.as_ref(), &id).await?;
        }
        Ok(current)
    }

    /// Node identities from head to tail
    ///
    /// Fails with `CycleDetected` if a `next` link revisits a node and with
    /// `DanglingLink` if a recorded link leads nowhere.
    pub async fn node_ids(&mut self) -> Result<Vec<Identity>, OrderError> {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        let Some(mut current) = self.load_head().await? else {
            return Ok(ids);
        };

        loop {
            if !seen.insert(current.clone()) {
                return Err(OrderError::CycleDetected { node: current });
            }
            ids.push(current.clone());
            match resolve_next(&mut self.nodes, self.graph.as_ref(), &current).await? {
                Some(next) => current = next,
                None => break,
            }
        }

        Ok(ids)
    }

    pub async fn len(&mut self) -> Result<usize, OrderError> {
        Ok(self.node_ids().await?.len())
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Identity of the node at `position`
    pub async fn node_id_at(&mut self, position: usize) -> Result<Identity, OrderError> {
        self.walk_to(position)
            .await?
            .ok_or_else(|| OrderError::out_of_range(position, position))
    }

    /// Identities of the wrapped elements, in order
    pub async fn target_ids(&mut self) -> Result<Vec<Identity>, OrderError> {
        let ids = self.node_ids().await?;
        Ok(ids
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(|n| n.proxy_for().cloned()))
            .collect())
    }

    /// Wrapped elements, in order, loaded through the target cache
    pub async fn targets(&mut self) -> Result<Vec<Record>, OrderError> {
        let ids = self.node_ids().await?;
        let mut targets = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(target) = resolve_target(
                &mut self.nodes,
                &mut self.targets,
                self.records.as_ref(),
                id,
            )
            .await?
            {
                targets.push(target);
            }
        }
        Ok(targets)
    }

    /// Check that the chain is a well-formed ordered list
    ///
    /// Head has no `prev`, tail has no `next`, every stored `next` is answered
    /// by a stored reciprocal `prev`, there are no cycles, the recorded tail is
    /// the last node reached and every node belongs to this list's container.
    pub async fn validate(&mut self) -> Result<(), OrderError> {
        let ids = self.node_ids().await?;

        let Some(last) = ids.last() else {
            if self.tail.is_some() {
                return Err(OrderError::malformed("tail recorded on an empty list"));
            }
            return Ok(());
        };
        if self.tail.as_ref() != Some(last) {
            return Err(OrderError::malformed(format!(
                "chain ends at '{}' but tail is {:?}",
                last, self.tail
            )));
        }

        for (i, id) in ids.iter().enumerate() {
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| OrderError::node_not_loaded(id.clone()))?;
            let expected_prev = i.checked_sub(1).map(|p| &ids[p]);
            let expected_next = ids.get(i + 1);

            // Session wiring fills in links on load, so compare stored links
            if node.stored_prev() != expected_prev {
                return Err(OrderError::malformed(format!(
                    "node '{}' has prev {:?}, expected {:?}",
                    id,
                    node.stored_prev(),
                    expected_prev
                )));
            }
            if node.stored_next() != expected_next {
                return Err(OrderError::malformed(format!(
                    "node '{}' has next {:?}, expected {:?}",
                    id,
                    node.stored_next(),
                    expected_next
                )));
            }
            if node.proxy_in() != Some(&self.container) {
                return Err(OrderError::malformed(format!(
                    "node '{}' is not contained in '{}'",
                    id, self.container
                )));
            }
        }

        Ok(())
    }

    /// `(node, target identity, materialized target)` per position
    pub(crate) async fn entries(
        &mut self,
    ) -> Result<Vec<(Identity, Option<Identity>, Option<Record>)>, OrderError> {
        let ids = self.node_ids().await?;
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let node = self
                .nodes
                .get(&id)
                .ok_or_else(|| OrderError::node_not_loaded(id.clone()))?;
            let proxy_for = node.proxy_for().cloned();
            let target = node.target().cloned();
            entries.push((id, proxy_for, target));
        }
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    fn touch(&mut self, id: &Identity) {
        if !self.touched.contains(id) {
            self.touched.push(id.clone());
        }
    }

    fn mint_node(&self) -> ListNode {
        ListNode::new(self.container.mint_fragment(), Some(self.container.clone()))
    }

    /// Append a node wrapping `record`, returning the new node's identity
    pub async fn append_target(&mut self, record: Record) -> Result<Identity, OrderError> {
        let mut node = self.mint_node();
        node.set_target(record);
        self.link_last(node).await
    }

    /// Append a node pointing at an element by identity only
    pub async fn append_proxy_for(&mut self, target: Identity) -> Result<Identity, OrderError> {
        let mut node = self.mint_node();
        node.set_proxy_for(target);
        self.link_last(node).await
    }

    /// Insert a node wrapping `record` so that it ends up at `position`
    pub async fn insert_at(
        &mut self,
        position: usize,
        record: Record,
    ) -> Result<Identity, OrderError> {
        let mut node = self.mint_node();
        node.set_target(record);
        self.splice_at(position, node).await
    }

    /// Same splice as [`insert_at`](Self::insert_at) for a bare element identity
    pub async fn insert_proxy_for_at(
        &mut self,
        position: usize,
        target: Identity,
    ) -> Result<Identity, OrderError> {
        let mut node = self.mint_node();
        node.set_proxy_for(target);
        self.splice_at(position, node).await
    }

    async fn link_last(&mut self, mut node: ListNode) -> Result<Identity, OrderError> {
        let id = node.uri().clone();
        self.touch(&id);

        match self.tail.clone() {
            Some(tail) => {
                let tail_node = fetch_node(
                    &mut self.nodes,
                    self.graph.as_ref(),
                    &tail,
                    &self.container,
                    LinkDirection::Tail,
                )
                .await?;
                tail_node.set_next(Some(id.clone()));
                node.set_prev(Some(tail.clone()));
                self.touch(&tail);
            }
            None => self.head = Some(id.clone()),
        }

        tracing::debug!("Linked node {} at tail of {}", id, self.container);
        self.tail = Some(id.clone());
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    async fn splice_at(&mut self, position: usize, mut node: ListNode) -> Result<Identity, OrderError> {
        let Some(at) = self.walk_to(position).await? else {
            return self.link_last(node).await;
        };

        let id = node.uri().clone();
        let prev = self
            .nodes
            .get(&at)
            .ok_or_else(|| OrderError::node_not_loaded(at.clone()))?
            .prev_id()
            .cloned();

        node.set_prev(prev.clone());
        node.set_next(Some(at.clone()));
        self.touch(&id);

        match &prev {
            Some(prev) => {
                let prev_node = fetch_node(
                    &mut self.nodes,
                    self.graph.as_ref(),
                    prev,
                    &at,
                    LinkDirection::Prev,
                )
                .await?;
                prev_node.set_next(Some(id.clone()));
                self.touch(prev);
            }
            None => self.head = Some(id.clone()),
        }

        if let Some(at_node) = self.nodes.get_mut(&at) {
            at_node.set_prev(Some(id.clone()));
        }
        self.touch(&at);

        tracing::debug!("Spliced node {} at position {} of {}", id, position, self.container);
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Detach a loaded node and relink its neighbors to each other
    async fn unlink(&mut self, id: &Identity) -> Result<ListNode, OrderError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| OrderError::node_not_loaded(id.clone()))?;
        let prev = node.prev_id().cloned();
        let next = node.next_id().cloned();

        // Predecessor first so an interrupted flush already skips the node
        match &prev {
            Some(prev_id) => {
                let prev_node = fetch_node(
                    &mut self.nodes,
                    self.graph.as_ref(),
                    prev_id,
                    id,
                    LinkDirection::Prev,
                )
                .await?;
                prev_node.set_next(next.clone());
                self.touch(prev_id);
            }
            None => self.head = next.clone(),
        }

        match &next {
            Some(next_id) => {
                let next_node = fetch_node(
                    &mut self.nodes,
                    self.graph.as_ref(),
                    next_id,
                    id,
                    LinkDirection::Next,
                )
                .await?;
                next_node.set_prev(prev.clone());
                self.touch(next_id);
            }
            None => self.tail = prev.clone(),
        }

        self.touched.retain(|t| t != id);
        self.removed.insert(id.clone());
        tracing::debug!("Unlinked node {} from {}", id, self.container);

        self.nodes
            .remove(id)
            .ok_or_else(|| OrderError::node_not_loaded(id.clone()))
    }

    /// Remove the node at `position`
    pub async fn delete_at(&mut self, position: usize) -> Result<ListNode, OrderError> {
        let id = self.node_id_at(position).await?;
        self.unlink(&id).await
    }

    /// Remove a node of this chain by identity (no-op if it is not part of it)
    pub async fn delete_node(&mut self, node_id: &Identity) -> Result<bool, OrderError> {
        if !self.node_ids().await?.contains(node_id) {
            return Ok(false);
        }
        self.unlink(node_id).await?;
        Ok(true)
    }

    /// Remove the first node wrapping `target` (no-op if absent)
    pub async fn delete_target(&mut self, target: &Identity) -> Result<bool, OrderError> {
        let ids = self.node_ids().await?;
        let found = ids
            .into_iter()
            .find(|id| self.wraps(id, target));

        match found {
            Some(id) => {
                self.unlink(&id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every node wrapping `target`, returning how many were removed
    pub async fn delete_target_all(&mut self, target: &Identity) -> Result<usize, OrderError> {
        let ids = self.node_ids().await?;
        let matching: Vec<Identity> = ids
            .into_iter()
            .filter(|id| self.wraps(id, target))
            .collect();

        for id in &matching {
            self.unlink(id).await?;
        }
        Ok(matching.len())
    }

    fn wraps(&self, node_id: &Identity, target: &Identity) -> bool {
        self.nodes
            .get(node_id)
            .is_some_and(|n| n.proxy_for() == Some(target))
    }

    /// Detach every node
    pub async fn clear(&mut self) -> Result<usize, OrderError> {
        let ids = self.node_ids().await?;
        for id in &ids {
            self.nodes.remove(id);
            self.removed.insert(id.clone());
        }
        self.touched.clear();
        self.head = None;
        self.tail = None;
        Ok(ids.len())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Save one node: its target (if materialized) then its projection
    pub async fn save_node(&mut self, id: &Identity) -> Result<(), OrderError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| OrderError::node_not_loaded(id.clone()))?;

        if node.save_target(self.records.as_ref()).await? {
            if let Some(saved) = node.target() {
                self.targets.insert(saved.id.clone(), saved.clone());
            }
        }
        self.graph.put_statements(id, node.to_projection()).await?;
        node.mark_stored();
        self.touched.retain(|t| t != id);
        Ok(())
    }

    /// Flush touched nodes in touch order, then delete removed nodes
    ///
    /// Returns whether anything was written. Not atomic across nodes; callers
    /// that keep a head/tail summary write it between
    /// [`persist_links`](Self::persist_links) and
    /// [`purge_removed`](Self::purge_removed) instead.
    pub async fn persist(&mut self) -> Result<bool, OrderError> {
        if !self.has_changes() {
            return Ok(false);
        }
        self.persist_links().await?;
        self.purge_removed().await?;
        Ok(true)
    }

    /// Write every touched node, in touch order
    pub async fn persist_links(&mut self) -> Result<usize, OrderError> {
        let touched = self.touched.clone();
        for id in &touched {
            self.save_node(id).await?;
        }
        if !touched.is_empty() {
            tracing::debug!(
                "Persisted {} node(s) of {}",
                touched.len(),
                self.container
            );
        }
        Ok(touched.len())
    }

    /// Delete the statements of removed nodes
    ///
    /// Once the chain ends no longer lead to them, an interrupted purge only
    /// leaves orphans behind.
    pub async fn purge_removed(&mut self) -> Result<usize, OrderError> {
        let mut purged = 0;
        while let Some(id) = self.removed.pop_first() {
            if let Err(e) = self.graph.delete_statements(&id).await {
                self.removed.insert(id);
                return Err(e.into());
            }
            purged += 1;
        }
        if purged > 0 {
            tracing::debug!("Deleted {} node(s) of {}", purged, self.container);
        }
        Ok(purged)
    }
}
