//! Record Data Structures
//!
//! This module defines the universal `Record` struct: the element type wrapped by
//! list nodes, and the owner type that hosts associations.
//!
//! # Architecture
//!
//! - **Universal Record**: One struct for every record type, entity data in `properties`
//! - **Membership on the owner**: Unordered associations are named identity sets
//! - **Order summary on the owner**: `head`/`tail` mirror the chain ends of its ordered list
//! - **Versioning**: `version == 0` means never saved; every save increments it
//!
//! # Examples
//!
//! ```rust
//! use strand_core::models::Record;
//! use serde_json::json;
//!
//! let page = Record::new("page".to_string(), json!({ "title": "Cover" }));
//! assert!(page.is_new_record());
//! assert_eq!(page.property("title"), Some(&json!("Cover")));
//! ```

use crate::models::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Validation errors for Record operations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid record type: {0}")]
    InvalidRecordType(String),

    #[error("Invalid record ID format: {0}")]
    InvalidId(String),

    #[error("Properties validation failed: {0}")]
    InvalidProperties(String),
}

/// Universal record persisted through a [`RecordStore`](crate::db::RecordStore).
///
/// # Fields
///
/// - `id`: Stable identity (UUID unless provided explicitly)
/// - `record_type`: Type identifier (e.g., "book", "page", "list-source")
/// - `properties`: JSON object containing all entity-specific fields
/// - `version`: Save counter, `0` until the record is first persisted
/// - `head` / `tail`: Identities of the first/last list node of the record's order
/// - `members`: Named unordered associations (association name -> member identities)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Stable identity
    pub id: Identity,

    /// Record type (e.g., "book", "page", "list-source")
    pub record_type: String,

    /// All entity-specific fields
    pub properties: serde_json::Value,

    /// Save counter (0 = never persisted)
    #[serde(default)]
    pub version: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,

    /// First node of this record's ordered list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Identity>,

    /// Last node of this record's ordered list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<Identity>,

    /// Unordered membership sets keyed by association name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub members: BTreeMap<String, BTreeSet<Identity>>,
}

impl Record {
    /// Create a new, unsaved record with an auto-generated UUID
    pub fn new(record_type: String, properties: serde_json::Value) -> Self {
        Self::new_with_id(Identity::generate(), record_type, properties)
    }

    /// Create a new, unsaved record with an explicit identity
    ///
    /// ```rust
    /// # use strand_core::models::{Identity, Record};
    /// # use serde_json::json;
    /// let book = Record::new_with_id(Identity::new("book-1"), "book".to_string(), json!({}));
    /// assert_eq!(book.id.as_str(), "book-1");
    /// ```
    pub fn new_with_id(id: Identity, record_type: String, properties: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            record_type,
            properties,
            version: 0,
            created_at: now,
            modified_at: now,
            head: None,
            tail: None,
            members: BTreeMap::new(),
        }
    }

    /// True until the record has been saved once
    pub fn is_new_record(&self) -> bool {
        self.version == 0
    }

    /// Bump the version after a successful save
    ///
    /// Stores call this on the copy they persist and hand back.
    pub fn mark_saved(&mut self) {
        self.version += 1;
        self.modified_at = Utc::now();
    }

    /// Look up a single property
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Boolean capability flag stored in properties (missing or non-bool = false)
    ///
    /// Filter predicates use these flags to classify records, e.g.
    /// `record.flag("collection")`.
    pub fn flag(&self, key: &str) -> bool {
        self.properties
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Member identities of a named unordered association
    pub fn member_ids(&self, association: &str) -> impl Iterator<Item = &Identity> {
        self.members.get(association).into_iter().flatten()
    }

    pub fn has_member(&self, association: &str, id: &Identity) -> bool {
        self.members
            .get(association)
            .is_some_and(|set| set.contains(id))
    }

    /// Add a member, returning `false` if it was already present
    pub fn add_member(&mut self, association: &str, id: Identity) -> bool {
        self.members
            .entry(association.to_string())
            .or_default()
            .insert(id)
    }

    /// Remove a member, returning `false` if it was absent
    pub fn remove_member(&mut self, association: &str, id: &Identity) -> bool {
        match self.members.get_mut(association) {
            Some(set) => {
                let removed = set.remove(id);
                if set.is_empty() {
                    self.members.remove(association);
                }
                removed
            }
            None => false,
        }
    }

    /// Validate structural requirements before persisting
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::InvalidId("id cannot be empty".to_string()));
        }

        if self.record_type.trim().is_empty() {
            return Err(ValidationError::MissingField("record_type".to_string()));
        }

        if !self.record_type.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ValidationError::InvalidRecordType(self.record_type.clone()));
        }

        if !self.properties.is_object() {
            return Err(ValidationError::InvalidProperties(
                "properties must be a JSON object".to_string(),
            ));
        }

        Ok(())
    }
}
