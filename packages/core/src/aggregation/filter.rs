//! Filtered views over a membership association
//!
//! A `FilteredAssociation` exposes the subset of an owner's members that
//! satisfy a named predicate (e.g. "child collections" among "members").
//! Writing through the view only touches members the predicate selects;
//! members outside the view are left alone.

use crate::aggregation::MembershipAssociation;
use crate::db::RecordStore;
use crate::models::{Identity, Record};
use crate::orders::OrderError;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a record belongs to a filtered view
pub type RecordPredicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// Named, predicate-filtered view of a membership association
#[derive(Clone)]
pub struct FilteredAssociation {
    name: String,
    predicate: RecordPredicate,
    membership: MembershipAssociation,
}

impl fmt::Debug for FilteredAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredAssociation")
            .field("name", &self.name)
            .field("membership", &self.membership.name())
            .finish()
    }
}

impl FilteredAssociation {
    pub fn new(
        name: impl Into<String>,
        membership: MembershipAssociation,
        predicate: RecordPredicate,
    ) -> Self {
        Self {
            name: name.into(),
            predicate,
            membership,
        }
    }

    /// View selecting members whose boolean property `flag` is true
    pub fn flag(
        name: impl Into<String>,
        membership_name: impl Into<String>,
        records: Arc<dyn RecordStore>,
        flag: &str,
    ) -> Self {
        let flag = flag.to_string();
        Self::new(
            name,
            MembershipAssociation::new(membership_name, records),
            Arc::new(move |record: &Record| record.flag(&flag)),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, record: &Record) -> bool {
        (self.predicate)(record)
    }

    fn check(&self, record: &Record) -> Result<(), OrderError> {
        if self.matches(record) {
            Ok(())
        } else {
            Err(OrderError::type_mismatch(
                self.name.clone(),
                record.id.clone(),
                record.record_type.clone(),
            ))
        }
    }

    /// Members selected by the predicate
    pub async fn read(&self, owner: &Record) -> Result<Vec<Record>, OrderError> {
        let members = self.membership.load_targets(owner).await?;
        Ok(members.into_iter().filter(|r| self.matches(r)).collect())
    }

    pub async fn ids(&self, owner: &Record) -> Result<Vec<Identity>, OrderError> {
        Ok(self.read(owner).await?.into_iter().map(|r| r.id).collect())
    }

    /// Add one record to the view (and so to the membership set)
    pub async fn append(&self, owner: &mut Record, record: Record) -> Result<Record, OrderError> {
        self.check(&record)?;
        let id = record.id.clone();
        let mut stored = self.membership.concat(owner, vec![record]).await?;
        stored.pop().ok_or_else(|| OrderError::record_not_found(id))
    }

    /// Replace the view's contents with `records`
    ///
    /// Every record must satisfy the predicate; otherwise nothing is written.
    /// Currently selected members not in `records` are removed from the
    /// membership set, unselected members are untouched.
    pub async fn write(&self, owner: &mut Record, records: Vec<Record>) -> Result<(), OrderError> {
        for record in &records {
            self.check(record)?;
        }

        let wanted: BTreeSet<Identity> = records.iter().map(|r| r.id.clone()).collect();
        let stale: Vec<Identity> = self
            .ids(owner)
            .await?
            .into_iter()
            .filter(|id| !wanted.contains(id))
            .collect();

        self.membership.delete(owner, &stale).await?;
        self.membership.concat(owner, records).await?;

        tracing::debug!(
            "Wrote filtered view '{}' on {} ({} removed)",
            self.name,
            owner.id,
            stale.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    fn collection() -> Record {
        Record::new("collection".to_string(), json!({ "collection": true }))
    }

    fn object() -> Record {
        Record::new("object".to_string(), json!({}))
    }

    fn setup() -> (FilteredAssociation, MembershipAssociation, Record) {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let view =
            FilteredAssociation::flag("child_collections", "members", store.clone(), "collection");
        let members = MembershipAssociation::new("members", store);
        let owner =
            Record::new_with_id(Identity::new("parent"), "collection".to_string(), json!({}));
        (view, members, owner)
    }

    #[tokio::test]
    async fn test_read_selects_matching_members() {
        let (view, members, mut owner) = setup();
        let c = collection();
        let o = object();
        members.concat(&mut owner, vec![c.clone(), o]).await.unwrap();

        assert_eq!(view.ids(&owner).await.unwrap(), vec![c.id]);
    }

    #[tokio::test]
    async fn test_write_replaces_only_matching_members() {
        let (view, members, mut owner) = setup();
        let c1 = collection();
        let c2 = collection();
        let o = object();
        members.concat(&mut owner, vec![c1.clone(), o.clone()]).await.unwrap();

        view.write(&mut owner, vec![c2.clone()]).await.unwrap();

        let ids = members.ids(&owner);
        assert!(ids.contains(&c2.id));
        assert!(ids.contains(&o.id), "unselected member survives");
        assert!(!ids.contains(&c1.id));
    }

    #[tokio::test]
    async fn test_non_matching_record_rejected_before_write() {
        let (view, members, mut owner) = setup();
        let c = collection();
        members.concat(&mut owner, vec![c.clone()]).await.unwrap();

        let err = view.write(&mut owner, vec![object()]).await.unwrap_err();
        assert!(matches!(err, OrderError::TypeMismatch { .. }));
        assert_eq!(members.ids(&owner), vec![c.id]);

        assert!(view.append(&mut owner, object()).await.is_err());
    }
}
