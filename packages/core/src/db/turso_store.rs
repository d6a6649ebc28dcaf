//! TursoStore - GraphStore and RecordStore over libsql
//!
//! List nodes are stored as triples in the `statements` table using the ORE
//! and IANA predicates from [`vocab`](super::graph_store::vocab); records are
//! stored whole as JSON in the `records` table.
//!
//! # Design Principles
//!
//! 1. **Pure Delegation**: Connection handling lives in `DatabaseService`
//! 2. **Subject-atomic writes**: `put_statements` replaces a subject's triples
//!    inside one transaction; nothing spans more than one subject
//! 3. **Row Conversion**: Handles libsql::Row -> model conversion in one place
//!
//! # Examples
//!
//! ```rust,no_run
//! use strand_core::config::DatabaseConfig;
//! use strand_core::db::{DatabaseService, GraphStore, TursoStore};
//! use strand_core::models::Identity;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(&DatabaseConfig::at("./data/strand.db")).await?);
//!     let store = TursoStore::new(db);
//!     let statements = store.get_statements(&Identity::new("book-1/list_source#a")).await?;
//!     Ok(())
//! }
//! ```

use crate::db::graph_store::{vocab, GraphStore, ProxyStatements, RecordStore};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{Identity, Record};
use anyhow::{Context, Result};
use async_trait::async_trait;
use libsql::Row;
use std::sync::Arc;

/// libsql-backed implementation of both store traits
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Convert a `(predicate, object)` row
    fn row_to_pair(row: &Row) -> Result<(String, String)> {
        let predicate: String = row.get(0).context("Failed to get predicate")?;
        let object: String = row.get(1).context("Failed to get object")?;
        Ok((predicate, object))
    }

    /// Convert a `body` row into a Record
    fn row_to_record(row: &Row) -> Result<Record> {
        let body: String = row.get(0).context("Failed to get body")?;
        serde_json::from_str(&body).context("Failed to parse record body")
    }

    /// Subjects having `predicate = object`
    async fn subjects_where(&self, predicate: &str, object: &Identity) -> Result<Vec<Identity>> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT subject FROM statements
                 WHERE predicate = ? AND object = ?
                 ORDER BY subject",
            )
            .await
            .map_err(DatabaseError::query("prepare subject query"))?;

        let mut rows = stmt
            .query((predicate, object.as_str()))
            .await
            .map_err(DatabaseError::query("subject query"))?;

        let mut subjects = Vec::new();
        while let Some(row) = rows.next().await? {
            let subject: String = row.get(0).context("Failed to get subject")?;
            subjects.push(Identity::new(subject));
        }
        Ok(subjects)
    }
}

#[async_trait]
impl GraphStore for TursoStore {
    async fn get_statements(&self, subject: &Identity) -> Result<Option<ProxyStatements>> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT predicate, object FROM statements
                 WHERE subject = ?
                 ORDER BY predicate, object",
            )
            .await
            .map_err(DatabaseError::query("prepare get_statements"))?;

        let mut rows = stmt
            .query([subject.as_str()])
            .await
            .map_err(DatabaseError::query("get_statements"))?;

        let mut pairs = Vec::new();
        while let Some(row) = rows.next().await? {
            pairs.push(Self::row_to_pair(&row)?);
        }

        if pairs.is_empty() {
            return Ok(None);
        }
        Ok(Some(ProxyStatements::from_pairs(pairs)))
    }

    async fn put_statements(&self, subject: &Identity, statements: ProxyStatements) -> Result<()> {
        let conn = self.db.connect_with_timeout().await?;
        let tx = conn.transaction().await?;

        tx.execute("DELETE FROM statements WHERE subject = ?", [subject.as_str()])
            .await
            .map_err(DatabaseError::query("clear statements"))?;

        for (predicate, object) in statements.to_pairs() {
            tx.execute(
                "INSERT INTO statements (subject, predicate, object) VALUES (?, ?, ?)",
                (subject.as_str(), predicate, object.as_str()),
            )
            .await
            .map_err(DatabaseError::query("insert statement"))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_statements(&self, subject: &Identity) -> Result<bool> {
        let conn = self.db.connect_with_timeout().await?;

        let deleted = conn
            .execute("DELETE FROM statements WHERE subject = ?", [subject.as_str()])
            .await
            .map_err(DatabaseError::query("delete statements"))?;

        Ok(deleted > 0)
    }

    async fn subjects_in(&self, container: &Identity) -> Result<Vec<Identity>> {
        self.subjects_where(vocab::PROXY_IN, container).await
    }

    async fn subjects_for(&self, target: &Identity) -> Result<Vec<Identity>> {
        self.subjects_where(vocab::PROXY_FOR, target).await
    }
}

#[async_trait]
impl RecordStore for TursoStore {
    async fn load(&self, id: &Identity) -> Result<Option<Record>> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare("SELECT body FROM records WHERE id = ?")
            .await
            .map_err(DatabaseError::query("prepare record load"))?;

        let mut rows = stmt
            .query([id.as_str()])
            .await
            .map_err(DatabaseError::query("record load"))?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &Record) -> Result<Record> {
        record.validate()?;

        let mut stored = record.clone();
        stored.mark_saved();
        let body = serde_json::to_string(&stored).context("Failed to serialize record")?;

        let conn = self.db.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO records (id, record_type, version, body) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                record_type = excluded.record_type,
                version = excluded.version,
                body = excluded.body",
            (
                stored.id.as_str(),
                stored.record_type.as_str(),
                stored.version,
                body.as_str(),
            ),
        )
        .await
        .map_err(DatabaseError::query("record upsert"))?;

        Ok(stored)
    }

    async fn delete(&self, id: &Identity) -> Result<bool> {
        let conn = self.db.connect_with_timeout().await?;

        let deleted = conn
            .execute("DELETE FROM records WHERE id = ?", [id.as_str()])
            .await
            .map_err(DatabaseError::query("record delete"))?;

        Ok(deleted > 0)
    }
}
