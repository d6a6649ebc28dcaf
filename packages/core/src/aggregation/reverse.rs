//! Reverse lookups: which owners order a given element

use crate::db::{GraphStore, RecordStore};
use crate::models::Identity;
use crate::orders::{ListSource, OrderError};
use std::collections::BTreeSet;

/// Owners whose ordered list contains a node wrapping `target`
///
/// Follows `proxyFor` back to nodes, `proxyIn` to their list source and the
/// list source's recorded owner. Results are sorted and deduplicated. Nodes
/// whose list source is gone are skipped.
pub async fn ordered_by(
    graph: &dyn GraphStore,
    records: &dyn RecordStore,
    target: &Identity,
) -> Result<Vec<Identity>, OrderError> {
    let mut containers = BTreeSet::new();
    for node in graph.subjects_for(target).await? {
        if let Some(container) = graph
            .get_statements(&node)
            .await?
            .and_then(|s| s.proxy_in)
        {
            containers.insert(container);
        }
    }

    let mut owners = BTreeSet::new();
    for container in containers {
        let Some(record) = records.load(&container).await? else {
            tracing::debug!("Skipping nodes of missing list source {}", container);
            continue;
        };
        if let Some(owner) = ListSource::from_record(record).owner() {
            owners.insert(owner);
        }
    }

    Ok(owners.into_iter().collect())
}

/// Convenience over [`ordered_by`] for a single candidate owner
pub async fn is_ordered_by(
    graph: &dyn GraphStore,
    records: &dyn RecordStore,
    target: &Identity,
    owner: &Identity,
    segment: &str,
) -> Result<bool, OrderError> {
    let container = ListSource::identity_for(owner, segment);
    for node in graph.subjects_for(target).await? {
        let in_container = graph
            .get_statements(&node)
            .await?
            .is_some_and(|s| s.proxy_in.as_ref() == Some(&container));
        if in_container {
            return Ok(records.load(&container).await?.is_some());
        }
    }
    Ok(false)
}
