//! Strand Core - persistent, graph-backed ordered aggregations
//!
//! This crate stores doubly linked lists as statements in a graph store and
//! keeps each ordered list coherent with an unordered membership set on the
//! owning record.
//!
//! # Architecture
//!
//! - **Nodes as statements**: every list position is a subject with
//!   `proxyFor`/`proxyIn`/`next`/`prev` triples
//! - **Arena traversal**: a per-session node cache owns materialized nodes;
//!   neighbors are referenced by identity only
//! - **Membership first**: an element is always an unordered member before it
//!   is linked into the order
//! - **libsql/Turso**: Embedded SQLite-compatible backend, plus an in-memory
//!   backend for tests and tooling
//!
//! # Modules
//!
//! - [`models`] - Identities and records
//! - [`db`] - Store traits and backends
//! - [`orders`] - Node cache, list nodes, ordered lists, ordered aggregation, repair
//! - [`aggregation`] - Unordered membership, filtered views, reverse lookups
//! - [`config`] - Association and database configuration
//! - [`logging`] - `tracing` subscriber setup

pub mod aggregation;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod orders;

// Re-export commonly used types
pub use config::{DatabaseConfig, OrderedAggregationConfig};
pub use models::{Identity, Record};
pub use orders::{ElementState, OrderError, OrderedAggregation, OrderedList, RepairReport};
