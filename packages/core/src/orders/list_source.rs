//! List Source - the container record an ordered list's nodes live in
//!
//! Every node's `proxy_in` names the list source, which is stored as an
//! ordinary record at `<owner>/<segment>`. Its `head`/`tail` are the
//! authoritative chain ends; the owner carries a copy that the association
//! refreshes once the list source has been saved cleanly.

use crate::db::RecordStore;
use crate::models::{Identity, Record};
use crate::orders::error::OrderError;
use serde_json::json;

/// Record type used for list source records
pub const LIST_SOURCE_TYPE: &str = "list-source";

/// Container record of one owner's ordered list
#[derive(Debug, Clone)]
pub struct ListSource {
    record: Record,
    changed: bool,
}

impl ListSource {
    /// Identity of the list source belonging to `owner`
    pub fn identity_for(owner: &Identity, segment: &str) -> Identity {
        owner.child(segment)
    }

    /// Load the owner's list source, or start a new unsaved one
    pub async fn load_or_new(
        records: &dyn RecordStore,
        owner: &Identity,
        segment: &str,
    ) -> Result<Self, OrderError> {
        let id = Self::identity_for(owner, segment);
        let record = match records.load(&id).await? {
            Some(record) => record,
            None => Record::new_with_id(
                id,
                LIST_SOURCE_TYPE.to_string(),
                json!({ "owner": owner.as_str() }),
            ),
        };
        Ok(Self::from_record(record))
    }

    /// Wrap an already loaded list source record
    pub fn from_record(record: Record) -> Self {
        Self {
            record,
            changed: false,
        }
    }

    pub fn id(&self) -> &Identity {
        &self.record.id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Owner recorded at creation, if any
    pub fn owner(&self) -> Option<Identity> {
        self.record
            .property("owner")
            .and_then(|v| v.as_str())
            .map(Identity::new)
    }

    pub fn head(&self) -> Option<&Identity> {
        self.record.head.as_ref()
    }

    pub fn tail(&self) -> Option<&Identity> {
        self.record.tail.as_ref()
    }

    /// True if head/tail changed since the last save
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Record new chain ends, marking the source dirty if they differ
    pub fn set_bounds(&mut self, head: Option<Identity>, tail: Option<Identity>) {
        if self.record.head != head || self.record.tail != tail {
            self.record.head = head;
            self.record.tail = tail;
            self.changed = true;
        }
    }

    /// Save if dirty; returns whether a write happened
    pub async fn save(&mut self, records: &dyn RecordStore) -> Result<bool, OrderError> {
        if !self.changed {
            return Ok(false);
        }
        self.record = records.save(&self.record).await?;
        self.changed = false;
        tracing::debug!(
            "Saved list source {} (head: {:?}, tail: {:?})",
            self.record.id,
            self.record.head,
            self.record.tail
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_new_source_is_clean_until_bounds_change() {
        let store = MemoryStore::new();
        let owner = Identity::new("book-1");
        let mut source = ListSource::load_or_new(&store, &owner, "list_source")
            .await
            .unwrap();

        assert_eq!(source.id().as_str(), "book-1/list_source");
        assert_eq!(source.owner(), Some(owner.clone()));
        assert!(!source.is_changed());

        source.set_bounds(Some(Identity::new("n1")), Some(Identity::new("n1")));
        assert!(source.is_changed());

        assert!(source.save(&store).await.unwrap());
        assert!(!source.is_changed());
        assert!(!source.save(&store).await.unwrap(), "clean source is not re-saved");

        let reloaded = ListSource::load_or_new(&store, &owner, "list_source")
            .await
            .unwrap();
        assert_eq!(reloaded.head(), Some(&Identity::new("n1")));
    }

    #[test]
    fn test_same_bounds_do_not_dirty() {
        let mut source = ListSource::from_record(Record::new_with_id(
            Identity::new("book-1/list_source"),
            LIST_SOURCE_TYPE.to_string(),
            json!({}),
        ));
        assert_eq!(source.owner(), None);
        source.set_bounds(None, None);
        assert!(!source.is_changed());
    }
}
