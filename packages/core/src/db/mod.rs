//! Database Layer
//!
//! This module handles persistence of list nodes and records:
//!
//! - [`GraphStore`] / [`RecordStore`] traits consumed by the ordered list core
//! - [`MemoryStore`]: in-memory backend with a crash fail-point
//! - [`TursoStore`]: libsql backend storing list nodes as triples
//!
//! # Architecture
//!
//! The ordered list never talks to a database directly. It reads and writes
//! `ProxyStatements` per node subject and whole `Record`s per identity; any
//! backend that can do those two things can host ordered aggregations.

mod database;
mod error;
mod graph_store;
mod memory_store;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use graph_store::{vocab, GraphStore, ProxyStatements, RecordStore};
pub use memory_store::MemoryStore;
pub use turso_store::TursoStore;
