//! List Node - one persisted position of an ordered list
//!
//! A node carries its own identity, the identity of the element it wraps
//! (`proxy_for`), the identity of the owning collection (`proxy_in`) and the
//! identities of its neighbors. Neighbors and targets are resolved lazily
//! through the session's [`NodeCache`]s by the free functions in this module;
//! nodes themselves only ever hold identities.

use crate::db::{GraphStore, ProxyStatements, RecordStore};
use crate::models::{Identity, Record};
use crate::orders::error::{LinkDirection, OrderError};
use crate::orders::node_cache::NodeCache;

/// Uniform element-like surface shared by list nodes and records
///
/// Lets generic collection code decide what to save without knowing whether it
/// holds a node or a record.
pub trait AutosaveState {
    fn is_destroyed(&self) -> bool;

    fn is_marked_for_destruction(&self) -> bool;

    fn is_valid(&self) -> bool;

    fn is_changed_for_autosave(&self) -> bool;

    fn is_new_record(&self) -> bool;
}

/// One position in an ordered list
#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    uri: Identity,
    proxy_for: Option<Identity>,
    proxy_in: Option<Identity>,
    next_uri: Option<Identity>,
    prev_uri: Option<Identity>,
    /// Links as last read from the store or set by link surgery; traversal
    /// wiring on a cache miss does not touch these
    stored_next: Option<Identity>,
    stored_prev: Option<Identity>,
    /// Target materialized in this session (set on creation or first resolve)
    target: Option<Record>,
}

impl ListNode {
    /// Fresh, unlinked node
    pub fn new(uri: Identity, proxy_in: Option<Identity>) -> Self {
        Self {
            uri,
            proxy_for: None,
            proxy_in,
            next_uri: None,
            prev_uri: None,
            stored_next: None,
            stored_prev: None,
            target: None,
        }
    }

    /// Populate a node from its persisted statements
    pub fn from_statements(uri: Identity, statements: ProxyStatements) -> Self {
        Self {
            uri,
            proxy_for: statements.proxy_for,
            proxy_in: statements.proxy_in,
            stored_next: statements.next.clone(),
            stored_prev: statements.prev.clone(),
            next_uri: statements.next,
            prev_uri: statements.prev,
            target: None,
        }
    }

    /// Read a node from the graph store (`Ok(None)` if it has no statements)
    pub async fn load(graph: &dyn GraphStore, uri: &Identity) -> Result<Option<Self>, OrderError> {
        let statements = graph.get_statements(uri).await?;
        Ok(statements.map(|s| Self::from_statements(uri.clone(), s)))
    }

    pub fn uri(&self) -> &Identity {
        &self.uri
    }

    pub fn proxy_for(&self) -> Option<&Identity> {
        self.proxy_for.as_ref()
    }

    pub fn proxy_in(&self) -> Option<&Identity> {
        self.proxy_in.as_ref()
    }

    pub fn next_id(&self) -> Option<&Identity> {
        self.next_uri.as_ref()
    }

    pub fn prev_id(&self) -> Option<&Identity> {
        self.prev_uri.as_ref()
    }

    /// `next` as stored (or as last relinked), ignoring traversal wiring
    pub fn stored_next(&self) -> Option<&Identity> {
        self.stored_next.as_ref()
    }

    /// `prev` as stored (or as last relinked), ignoring traversal wiring
    pub fn stored_prev(&self) -> Option<&Identity> {
        self.stored_prev.as_ref()
    }

    /// Target if it has been materialized in this session
    pub fn target(&self) -> Option<&Record> {
        self.target.as_ref()
    }

    pub(crate) fn set_next(&mut self, next: Option<Identity>) {
        self.stored_next = next.clone();
        self.next_uri = next;
    }

    pub(crate) fn set_prev(&mut self, prev: Option<Identity>) {
        self.stored_prev = prev.clone();
        self.prev_uri = prev;
    }

    /// Session links now match what was written
    pub(crate) fn mark_stored(&mut self) {
        self.stored_next = self.next_uri.clone();
        self.stored_prev = self.prev_uri.clone();
    }

    /// Wrap a record; its identity becomes `proxy_for`
    pub(crate) fn set_target(&mut self, record: Record) {
        self.proxy_for = Some(record.id.clone());
        self.target = Some(record);
    }

    /// Point at an element by identity only (target stays unmaterialized)
    pub(crate) fn set_proxy_for(&mut self, target: Identity) {
        if self.proxy_for.as_ref() != Some(&target) {
            self.target = None;
        }
        self.proxy_for = Some(target);
    }

    /// Graph representation written to the store on save
    pub fn to_projection(&self) -> ProxyStatements {
        ProxyStatements {
            proxy_for: self.proxy_for.clone(),
            proxy_in: self.proxy_in.clone(),
            next: self.next_uri.clone(),
            prev: self.prev_uri.clone(),
        }
    }

    /// Persist the target if it was accessed or set in this session
    ///
    /// Returns whether a save happened. Untouched targets are not re-saved.
    pub async fn save_target(&mut self, records: &dyn RecordStore) -> Result<bool, OrderError> {
        match self.target.as_ref() {
            Some(target) => {
                let saved = records.save(target).await?;
                self.target = Some(saved);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl AutosaveState for ListNode {
    fn is_destroyed(&self) -> bool {
        false
    }

    fn is_marked_for_destruction(&self) -> bool {
        false
    }

    fn is_valid(&self) -> bool {
        true
    }

    // Always re-save rather than risk a stale projection
    fn is_changed_for_autosave(&self) -> bool {
        true
    }

    fn is_new_record(&self) -> bool {
        self.target.as_ref().is_some_and(|t| t.is_new_record())
    }
}

impl AutosaveState for Record {
    fn is_destroyed(&self) -> bool {
        false
    }

    fn is_marked_for_destruction(&self) -> bool {
        false
    }

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn is_changed_for_autosave(&self) -> bool {
        true
    }

    fn is_new_record(&self) -> bool {
        Record::is_new_record(self)
    }
}

/// Load a node into the session, failing if its statements are missing
///
/// `from`/`direction` describe the pointer that led here and are only used
/// for the error.
pub(crate) async fn fetch_node<'a>(
    nodes: &'a mut NodeCache<ListNode>,
    graph: &dyn GraphStore,
    id: &Identity,
    from: &Identity,
    direction: LinkDirection,
) -> Result<&'a mut ListNode, OrderError> {
    nodes
        .fetch(id, || async move {
            ListNode::load(graph, id)
                .await?
                .ok_or_else(|| OrderError::dangling(from.clone(), id.clone(), direction))
        })
        .await
}

/// Resolve the node after `id`, or `None` at the tail
///
/// On a cache miss the neighbor is loaded and `id` is wired in as its `prev`,
/// so crossing the same edge again in this session never refetches it.
pub async fn resolve_next(
    nodes: &mut NodeCache<ListNode>,
    graph: &dyn GraphStore,
    id: &Identity,
) -> Result<Option<Identity>, OrderError> {
    resolve_neighbor(nodes, graph, id, LinkDirection::Next).await
}

/// Resolve the node before `id`, or `None` at the head
///
/// Mirror of [`resolve_next`]: a freshly loaded predecessor gets `id` as `next`.
pub async fn resolve_prev(
    nodes: &mut NodeCache<ListNode>,
    graph: &dyn GraphStore,
    id: &Identity,
) -> Result<Option<Identity>, OrderError> {
    resolve_neighbor(nodes, graph, id, LinkDirection::Prev).await
}

async fn resolve_neighbor(
    nodes: &mut NodeCache<ListNode>,
    graph: &dyn GraphStore,
    id: &Identity,
    direction: LinkDirection,
) -> Result<Option<Identity>, OrderError> {
    let node = nodes
        .get(id)
        .ok_or_else(|| OrderError::node_not_loaded(id.clone()))?;

    let neighbor = match direction {
        LinkDirection::Prev => node.prev_id().cloned(),
        _ => node.next_id().cloned(),
    };
    let Some(neighbor) = neighbor else {
        return Ok(None);
    };

    nodes
        .fetch(&neighbor, || async {
            let mut loaded = ListNode::load(graph, &neighbor)
                .await?
                .ok_or_else(|| OrderError::dangling(id.clone(), neighbor.clone(), direction))?;
            match direction {
                LinkDirection::Prev => loaded.next_uri = Some(id.clone()),
                _ => loaded.prev_uri = Some(id.clone()),
            }
            Ok::<_, OrderError>(loaded)
        })
        .await?;

    Ok(Some(neighbor))
}

/// Resolve the element wrapped by node `id`
///
/// Loads through the target cache on first access and materializes the record
/// on the node, which makes it eligible for [`ListNode::save_target`].
pub async fn resolve_target(
    nodes: &mut NodeCache<ListNode>,
    targets: &mut NodeCache<Record>,
    records: &dyn RecordStore,
    id: &Identity,
) -> Result<Option<Record>, OrderError> {
    let node = nodes
        .get_mut(id)
        .ok_or_else(|| OrderError::node_not_loaded(id.clone()))?;

    if let Some(target) = node.target() {
        return Ok(Some(target.clone()));
    }
    let Some(target_id) = node.proxy_for().cloned() else {
        return Ok(None);
    };

    let record = targets
        .fetch(&target_id, || async {
            records
                .load(&target_id)
                .await?
                .ok_or_else(|| OrderError::record_not_found(target_id.clone()))
        })
        .await?
        .clone();

    node.target = Some(record.clone());
    Ok(Some(record))
}
