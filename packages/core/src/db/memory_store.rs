//! MemoryStore - In-Memory GraphStore and RecordStore
//!
//! Ephemeral backend used by tests, benchmarks and short-lived tooling.
//!
//! # Thread Safety
//!
//! Both maps sit behind `tokio::sync::RwLock`; the store can be shared with
//! `Arc` across tasks.
//!
//! # Crash Simulation
//!
//! [`MemoryStore::fail_writes_after`] arms a fail-point: after the given number
//! of successful writes every further write returns an error until
//! [`MemoryStore::disarm`] is called. This reproduces a crash between the steps
//! of a multi-write relink.

use crate::db::graph_store::{GraphStore, ProxyStatements, RecordStore};
use crate::models::{Identity, Record};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tokio::sync::RwLock;

const DISARMED: i64 = -1;

/// In-memory implementation of both store traits
#[derive(Debug)]
pub struct MemoryStore {
    statements: RwLock<HashMap<Identity, ProxyStatements>>,
    records: RwLock<HashMap<Identity, Record>>,
    /// Writes still allowed before the fail-point trips (`-1` = disarmed)
    writes_remaining: AtomicI64,
    /// Total successful writes, for assertions in tests
    write_count: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            statements: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            writes_remaining: AtomicI64::new(DISARMED),
            write_count: AtomicUsize::new(0),
        }
    }

    /// Allow `writes` more writes, then fail every write after that
    pub fn fail_writes_after(&self, writes: usize) {
        self.writes_remaining
            .store(writes as i64, Ordering::SeqCst);
    }

    /// Clear the fail-point
    pub fn disarm(&self) {
        self.writes_remaining.store(DISARMED, Ordering::SeqCst);
    }

    /// Number of successful writes (statements and records) so far
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Number of node subjects with statements
    pub async fn statement_count(&self) -> usize {
        self.statements.read().await.len()
    }

    /// Check the fail-point before a write
    fn begin_write(&self, what: &str) -> Result<()> {
        // Decrement and check in one step so concurrent writers share the budget
        let allowed = self
            .writes_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                match remaining {
                    0 => None,
                    DISARMED => Some(DISARMED),
                    n => Some(n - 1),
                }
            });
        if allowed.is_err() {
            tracing::debug!("MemoryStore fail-point tripped on {}", what);
            bail!("simulated store failure while writing {}", what);
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn get_statements(&self, subject: &Identity) -> Result<Option<ProxyStatements>> {
        Ok(self.statements.read().await.get(subject).cloned())
    }

    async fn put_statements(&self, subject: &Identity, statements: ProxyStatements) -> Result<()> {
        self.begin_write(subject.as_str())?;
        self.statements
            .write()
            .await
            .insert(subject.clone(), statements);
        Ok(())
    }

    async fn delete_statements(&self, subject: &Identity) -> Result<bool> {
        self.begin_write(subject.as_str())?;
        Ok(self.statements.write().await.remove(subject).is_some())
    }

    async fn subjects_in(&self, container: &Identity) -> Result<Vec<Identity>> {
        let statements = self.statements.read().await;
        let mut subjects: Vec<Identity> = statements
            .iter()
            .filter(|(_, s)| s.proxy_in.as_ref() == Some(container))
            .map(|(subject, _)| subject.clone())
            .collect();
        subjects.sort();
        Ok(subjects)
    }

    async fn subjects_for(&self, target: &Identity) -> Result<Vec<Identity>> {
        let statements = self.statements.read().await;
        let mut subjects: Vec<Identity> = statements
            .iter()
            .filter(|(_, s)| s.proxy_for.as_ref() == Some(target))
            .map(|(subject, _)| subject.clone())
            .collect();
        subjects.sort();
        Ok(subjects)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load(&self, id: &Identity) -> Result<Option<Record>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn save(&self, record: &Record) -> Result<Record> {
        record.validate()?;
        self.begin_write(record.id.as_str())?;

        let mut stored = record.clone();
        stored.mark_saved();
        self.records
            .write()
            .await
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &Identity) -> Result<bool> {
        self.begin_write(id.as_str())?;
        Ok(self.records.write().await.remove(id).is_some())
    }
}
