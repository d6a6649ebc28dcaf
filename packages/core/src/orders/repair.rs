//! Repair traversal for interrupted list writes
//!
//! Multi-node relinks are flushed one subject at a time, so a crash can leave
//! a one-sided link, an orphan node, or a stale head/tail summary. `repair`
//! works on raw statements (no [`OrderedList`](super::OrderedList) session)
//! and restores a well-formed chain:
//!
//! 1. pick the recorded head (list source, then owner) or, failing that, a
//!    node with no predecessor; rewind through `prev` links that are answered
//!    by a matching `next`. A saved list source with no head means empty.
//! 2. walk forward, rewriting any `prev` that does not point back. A `next`
//!    naming a missing node is bridged to the node whose `prev` names that
//!    same missing node; otherwise, or on a revisited node, the chain is cut
//! 3. delete container nodes the walk never reached
//! 4. write the chain ends to the list source and the owner
//! 5. re-add ordered targets missing from the membership set
//!
//! Running it on a healthy list changes nothing, and a second run after a
//! repair reports clean.

use crate::config::OrderedAggregationConfig;
use crate::db::{GraphStore, ProxyStatements, RecordStore};
use crate::models::{Identity, Record};
use crate::orders::error::OrderError;
use crate::orders::list_source::{ListSource, LIST_SOURCE_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};

/// What a repair pass found and fixed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub owner: Identity,
    /// Nodes in the repaired chain
    pub length: usize,
    /// Nodes whose `prev`/`next` were rewritten
    pub relinked: Vec<Identity>,
    /// Node whose `next` was cut because it dangled or looped
    pub truncated_at: Option<Identity>,
    /// Nodes re-joined to the chain across a missing predecessor
    pub bridged: Vec<Identity>,
    /// Container nodes unreachable from the head, now deleted
    pub orphans_removed: Vec<Identity>,
    /// Whether head/tail on the list source or owner were rewritten
    pub bounds_fixed: bool,
    /// Ordered targets re-added to the membership set
    pub members_restored: Vec<Identity>,
}

impl RepairReport {
    pub fn new(owner: Identity) -> Self {
        Self {
            owner,
            length: 0,
            relinked: Vec::new(),
            truncated_at: None,
            bridged: Vec::new(),
            orphans_removed: Vec::new(),
            bounds_fixed: false,
            members_restored: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.relinked.is_empty()
            && self.truncated_at.is_none()
            && self.bridged.is_empty()
            && self.orphans_removed.is_empty()
            && !self.bounds_fixed
            && self.members_restored.is_empty()
    }
}

/// Repair the ordered list of `owner`
pub async fn repair(
    graph: &dyn GraphStore,
    records: &dyn RecordStore,
    config: &OrderedAggregationConfig,
    owner_id: &Identity,
) -> Result<RepairReport, OrderError> {
    config.validate().map_err(OrderError::InvalidConfig)?;

    let mut owner = records
        .load(owner_id)
        .await?
        .ok_or_else(|| OrderError::record_not_found(owner_id.clone()))?;
    let container = ListSource::identity_for(owner_id, &config.list_source_segment);
    let source = records.load(&container).await?;

    let mut report = RepairReport::new(owner_id.clone());

    // Every node that claims to live in this container
    let mut universe: HashMap<Identity, ProxyStatements> = HashMap::new();
    for subject in graph.subjects_in(&container).await? {
        if let Some(statements) = graph.get_statements(&subject).await? {
            universe.insert(subject, statements);
        }
    }

    // A saved list source is authoritative, even when it records no head
    let head = match &source {
        Some(s) if s.head.is_none() => None,
        Some(s) => find_head(&universe, s.head.clone()),
        None => find_head(&universe, owner.head.clone()),
    };

    // Walk forward, fixing links in the in-memory copy
    let mut chain: Vec<Identity> = Vec::new();
    let mut visited: HashSet<Identity> = HashSet::new();
    let mut changed: Vec<Identity> = Vec::new();

    if let Some(head) = head {
        if let Some(statements) = universe.get_mut(&head) {
            if statements.prev.is_some() {
                statements.prev = None;
                changed.push(head.clone());
            }
        }

        let mut current = head;
        loop {
            visited.insert(current.clone());
            chain.push(current.clone());

            let next = universe.get(&current).and_then(|s| s.next.clone());
            let Some(mut next) = next else {
                break;
            };

            if !universe.contains_key(&next) {
                if let Some(resume) = find_resume(&universe, &visited, &next) {
                    tracing::warn!(
                        "Bridging chain of {} over missing node {}: {} -> {}",
                        container,
                        next,
                        current,
                        resume
                    );
                    if let Some(statements) = universe.get_mut(&current) {
                        statements.next = Some(resume.clone());
                    }
                    push_unique(&mut changed, &current);
                    report.bridged.push(resume.clone());
                    next = resume;
                }
            }

            if !universe.contains_key(&next) || visited.contains(&next) {
                tracing::warn!(
                    "Cutting chain of {} at {}: next {} is unusable",
                    container,
                    current,
                    next
                );
                if let Some(statements) = universe.get_mut(&current) {
                    statements.next = None;
                }
                push_unique(&mut changed, &current);
                report.truncated_at = Some(current.clone());
                break;
            }

            if let Some(statements) = universe.get_mut(&next) {
                if statements.prev.as_ref() != Some(&current) {
                    tracing::warn!("Restoring prev of {} to {}", next, current);
                    statements.prev = Some(current.clone());
                    push_unique(&mut changed, &next);
                }
            }
            current = next;
        }
    }

    for id in &changed {
        if let Some(statements) = universe.get(id) {
            graph.put_statements(id, statements.clone()).await?;
        }
    }
    report.relinked = changed;
    report.length = chain.len();

    let mut orphans: Vec<Identity> = universe
        .keys()
        .filter(|id| !visited.contains(*id))
        .cloned()
        .collect();
    orphans.sort();
    for orphan in &orphans {
        tracing::warn!("Removing orphan node {} of {}", orphan, container);
        graph.delete_statements(orphan).await?;
    }
    report.orphans_removed = orphans;

    let head = chain.first().cloned();
    let tail = chain.last().cloned();

    // List source first, owner copy after
    let source_stale = match &source {
        Some(s) => s.head != head || s.tail != tail,
        None => head.is_some(),
    };
    if source_stale {
        let mut source = source.unwrap_or_else(|| {
            Record::new_with_id(
                container.clone(),
                LIST_SOURCE_TYPE.to_string(),
                json!({ "owner": owner_id.as_str() }),
            )
        });
        source.head = head.clone();
        source.tail = tail.clone();
        records.save(&source).await?;
        report.bounds_fixed = true;
    }

    let mut owner_dirty = false;
    if owner.head != head || owner.tail != tail {
        owner.head = head;
        owner.tail = tail;
        owner_dirty = true;
        report.bounds_fixed = true;
    }

    for id in &chain {
        if let Some(target) = universe.get(id).and_then(|s| s.proxy_for.clone()) {
            if owner.add_member(&config.unordered, target.clone()) {
                report.members_restored.push(target);
                owner_dirty = true;
            }
        }
    }

    if owner_dirty {
        records.save(&owner).await?;
    }

    if report.is_clean() {
        tracing::debug!("Ordered list of {} is consistent", owner_id);
    } else {
        tracing::warn!(
            "Repaired ordered list of {}: {} relinked, {} bridged, {} orphan(s) removed",
            owner_id,
            report.relinked.len(),
            report.bridged.len(),
            report.orphans_removed.len()
        );
    }
    Ok(report)
}

/// Choose where the chain starts
fn find_head(
    universe: &HashMap<Identity, ProxyStatements>,
    recorded: Option<Identity>,
) -> Option<Identity> {
    let start = match recorded.filter(|id| universe.contains_key(id)) {
        Some(id) => id,
        None => {
            // No usable recorded head: first node without a known predecessor
            universe
                .iter()
                .filter(|(_, s)| s.prev.as_ref().map_or(true, |p| !universe.contains_key(p)))
                .map(|(id, _)| id)
                .min()?
                .clone()
        }
    };

    // A node spliced in before the head may be fully linked yet unrecorded
    let mut head = start;
    let mut seen = HashSet::new();
    seen.insert(head.clone());
    while let Some(prev) = universe.get(&head).and_then(|s| s.prev.clone()) {
        let answers = universe
            .get(&prev)
            .is_some_and(|s| s.next.as_ref() == Some(&head));
        if !answers || !seen.insert(prev.clone()) {
            break;
        }
        head = prev;
    }
    Some(head)
}

/// Unvisited node whose `prev` names the missing node `gap`
fn find_resume(
    universe: &HashMap<Identity, ProxyStatements>,
    visited: &HashSet<Identity>,
    gap: &Identity,
) -> Option<Identity> {
    universe
        .iter()
        .filter(|(id, s)| !visited.contains(*id) && s.prev.as_ref() == Some(gap))
        .map(|(id, _)| id)
        .min()
        .cloned()
}

fn push_unique(ids: &mut Vec<Identity>, id: &Identity) {
    if !ids.contains(id) {
        ids.push(id.clone());
    }
}
