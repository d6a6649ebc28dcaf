//! Database Error Types
//!
//! Errors raised by the libsql backend. Store traits surface them through
//! `anyhow`; list-level failures are reported separately by
//! [`OrderError`](crate::orders::OrderError).

use std::path::PathBuf;
use thiserror::Error;

/// libsql backend errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Database file could not be opened or created
    #[error("Cannot open triple store at {path}: {source}")]
    Open {
        path: PathBuf,
        source: libsql::Error,
    },

    /// `DatabaseConfig` failed validation
    #[error("Invalid database configuration: {0}")]
    InvalidConfig(String),

    /// No write access to the database location
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Parent directory could not be created
    #[error("Cannot create database directory: {0}")]
    Directory(#[from] std::io::Error),

    /// Creating a table, index or pragma failed
    #[error("Schema setup failed for {object}: {source}")]
    Schema {
        object: &'static str,
        source: libsql::Error,
    },

    /// A statement against `statements` or `records` failed
    #[error("{operation} failed: {source}")]
    Query {
        operation: &'static str,
        source: libsql::Error,
    },

    /// Connection or transaction error outside a named operation
    #[error(transparent)]
    Libsql(#[from] libsql::Error),
}

impl DatabaseError {
    pub fn open(path: PathBuf, source: libsql::Error) -> Self {
        Self::Open { path, source }
    }

    /// `map_err` adapter tagging a libsql error with the schema object
    pub fn schema(object: &'static str) -> impl FnOnce(libsql::Error) -> Self {
        move |source| Self::Schema { object, source }
    }

    /// `map_err` adapter tagging a libsql error with the operation
    pub fn query(operation: &'static str) -> impl FnOnce(libsql::Error) -> Self {
        move |source| Self::Query { operation, source }
    }
}
