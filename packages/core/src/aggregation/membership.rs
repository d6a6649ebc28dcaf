//! Unordered membership association
//!
//! A named set of element identities kept on the owner record
//! (`Record::members[name]`). Ordered aggregations are layered on top of one
//! of these; this type knows nothing about order.

use crate::db::RecordStore;
use crate::models::{Identity, Record};
use crate::orders::OrderError;
use std::sync::Arc;

/// Named unordered set of members on an owner record
#[derive(Clone)]
pub struct MembershipAssociation {
    name: String,
    records: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for MembershipAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipAssociation")
            .field("name", &self.name)
            .finish()
    }
}

impl MembershipAssociation {
    pub fn new(name: impl Into<String>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member identities, sorted
    pub fn ids(&self, owner: &Record) -> Vec<Identity> {
        owner.member_ids(&self.name).cloned().collect()
    }

    pub fn contains(&self, owner: &Record, id: &Identity) -> bool {
        owner.has_member(&self.name, id)
    }

    /// Add records to the set
    ///
    /// New records are saved first so every member identity resolves. The
    /// owner is saved once if the set grew. Returns the records as stored.
    pub async fn concat(
        &self,
        owner: &mut Record,
        elements: Vec<Record>,
    ) -> Result<Vec<Record>, OrderError> {
        let mut stored = Vec::with_capacity(elements.len());
        let mut grew = false;

        for element in elements {
            let element = if element.is_new_record() {
                self.records.save(&element).await?
            } else {
                element
            };
            grew |= owner.add_member(&self.name, element.id.clone());
            stored.push(element);
        }

        if grew {
            *owner = self.records.save(owner).await?;
            tracing::debug!("Owner {} gained members in '{}'", owner.id, self.name);
        }
        Ok(stored)
    }

    /// Remove identities from the set, saving the owner if any were present
    pub async fn delete(&self, owner: &mut Record, ids: &[Identity]) -> Result<usize, OrderError> {
        let removed = ids
            .iter()
            .filter(|id| owner.remove_member(&self.name, id))
            .count();

        if removed > 0 {
            *owner = self.records.save(owner).await?;
            tracing::debug!("Owner {} lost {} member(s) of '{}'", owner.id, removed, self.name);
        }
        Ok(removed)
    }

    /// Load every member record
    pub async fn load_targets(&self, owner: &Record) -> Result<Vec<Record>, OrderError> {
        let mut targets = Vec::new();
        for id in owner.member_ids(&self.name) {
            let record = self
                .records
                .load(id)
                .await?
                .ok_or_else(|| OrderError::record_not_found(id.clone()))?;
            targets.push(record);
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    fn setup() -> (Arc<MemoryStore>, MembershipAssociation, Record) {
        let store = Arc::new(MemoryStore::new());
        let members = MembershipAssociation::new("members", store.clone());
        let owner = Record::new_with_id(Identity::new("book-1"), "book".to_string(), json!({}));
        (store, members, owner)
    }

    #[tokio::test]
    async fn test_concat_saves_new_records_and_owner() {
        let (store, members, mut owner) = setup();
        let page = Record::new("page".to_string(), json!({}));

        let stored = members.concat(&mut owner, vec![page.clone()]).await.unwrap();

        assert_eq!(stored[0].version, 1);
        assert!(members.contains(&owner, &page.id));
        assert_eq!(owner.version, 1);
        assert!(store.load(&page.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concat_existing_member_does_not_resave_owner() {
        let (store, members, mut owner) = setup();
        let page = Record::new("page".to_string(), json!({}));
        let stored = members.concat(&mut owner, vec![page]).await.unwrap();

        let writes = store.write_count();
        members.concat(&mut owner, stored).await.unwrap();
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_delete_and_load_targets() {
        let (_store, members, mut owner) = setup();
        let a = Record::new("page".to_string(), json!({ "n": 1 }));
        let b = Record::new("page".to_string(), json!({ "n": 2 }));
        members.concat(&mut owner, vec![a.clone(), b.clone()]).await.unwrap();

        assert_eq!(members.delete(&mut owner, &[a.id.clone()]).await.unwrap(), 1);
        assert_eq!(members.delete(&mut owner, &[a.id.clone()]).await.unwrap(), 0);

        let targets = members.load_targets(&owner).await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, b.id);
    }
}
