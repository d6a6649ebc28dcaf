//! DatabaseService - libsql Connection and Schema Management
//!
//! Owns the embedded libsql database that backs [`TursoStore`](super::TursoStore).
//!
//! # Schema
//!
//! - `statements`: one row per `(subject, predicate, object)` triple describing list nodes
//! - `records`: one row per record, entity body stored as JSON
//!
//! Initialization is idempotent (`CREATE TABLE IF NOT EXISTS`), so opening an
//! existing database is safe.

use crate::config::DatabaseConfig;
use crate::db::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Embedded libsql database with the Strand schema applied
pub struct DatabaseService {
    db: Arc<Database>,
    pub db_path: PathBuf,
    busy_timeout_ms: u64,
}

impl DatabaseService {
    /// Open (or create) the database described by `config`
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - The configuration is invalid
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use strand_core::config::DatabaseConfig;
    /// # use strand_core::db::DatabaseService;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let db_service = DatabaseService::new(&DatabaseConfig::at("./data/strand.db")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        config
            .validate()
            .map_err(DatabaseError::InvalidConfig)?;

        let db_path = config.path.clone();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::PermissionDenied {
                            path: db_path.clone(),
                        }
                    } else {
                        DatabaseError::Directory(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::open(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            busy_timeout_ms: config.busy_timeout_ms,
        };

        service.initialize_schema().await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn
            .prepare(pragma)
            .await
            .map_err(DatabaseError::schema("pragma"))?;
        let _ = stmt
            .query(())
            .await
            .map_err(DatabaseError::schema("pragma"))?;
        Ok(())
    }

    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS statements (
                subject TEXT NOT NULL,
                predicate TEXT NOT NULL,
                object TEXT NOT NULL,
                PRIMARY KEY (subject, predicate, object)
            )",
            (),
        )
        .await
        .map_err(DatabaseError::schema("statements table"))?;

        // Reverse lookups (subjects_in / subjects_for) go through predicate + object
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_statements_predicate_object
             ON statements(predicate, object)",
            (),
        )
        .await
        .map_err(DatabaseError::schema("statements index"))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                record_type TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0,
                body JSON NOT NULL
            )",
            (),
        )
        .await
        .map_err(DatabaseError::schema("records table"))?;

        tracing::debug!("Initialized schema at {:?}", self.db_path);
        Ok(())
    }

    /// Get a connection with busy timeout configured
    ///
    /// Use this for all async functions: concurrent operations wait on a
    /// locked database instead of failing immediately.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.db.connect()?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms),
        )
        .await?;

        Ok(conn)
    }
}
