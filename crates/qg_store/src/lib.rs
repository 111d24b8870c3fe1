//! `qg_store` - `DuckDB` analytics store for querygate
//!
//! This crate provides:
//! - `DuckDB` connection management
//! - Schema migrations for the known analytic tables
//! - Tabular query results with column metadata, as JSON rows
//! - SQL-literal escaping for generated queries

use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, instrument};

pub mod migrations;
pub mod schema;

pub use schema::KNOWN_TABLES;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] duckdb::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A tabular query result: column names plus rows as JSON objects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
}

/// `DuckDB`-backed analytics store
#[derive(Clone)]
pub struct AnalyticsStore {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl AnalyticsStore {
    /// Open or create the database at `path` and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if directory creation, database opening, or
    /// migration execution fails.
    #[instrument]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        info!(path = %path.display(), "Opening DuckDB database");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_string_lossy().to_string(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if in-memory database setup or migrations fail.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: ":memory:".to_string(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        migrations::run_all(&conn)
    }

    /// Execute a batch of SQL statements
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if batch execution fails.
    ///
    /// # Panics
    ///
    /// Panics if the internal database mutex is poisoned.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Execute a single statement without parameters
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if statement execution fails.
    ///
    /// # Panics
    ///
    /// Panics if the internal database mutex is poisoned.
    pub fn execute_simple(&self, sql: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(sql, [])?;
        Ok(affected)
    }

    /// Run a read query and return rows as JSON objects with column names.
    ///
    /// Rows are produced by `DuckDB`'s own `to_json`, so every column type
    /// the engine supports serializes consistently. A trailing semicolon
    /// is tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if query execution fails or a row cannot be
    /// parsed as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the internal database mutex is poisoned.
    pub fn query_table(&self, sql: &str) -> Result<TableData, StoreError> {
        let conn = self.conn.lock().unwrap();

        let bare = sql.trim().trim_end_matches(';').trim_end();
        if bare.is_empty() {
            return Err(StoreError::QueryError("empty query".to_string()));
        }

        let json_sql = format!("SELECT to_json(_row) FROM ({bare}) AS _row");
        let mut stmt = conn.prepare(&json_sql)?;
        let mut result_rows = stmt.query([])?;

        let mut rows = Vec::new();
        while let Some(row) = result_rows.next()? {
            let json_str: String = row.get(0)?;
            let value: serde_json::Value = serde_json::from_str(&json_str)?;
            rows.push(value);
        }

        // DESCRIBE keeps the select-list order; fall back to the first
        // row's keys if the statement cannot be described.
        let mut columns = describe_columns(&conn, bare);
        if columns.is_empty()
            && let Some(serde_json::Value::Object(first)) = rows.first()
        {
            columns = first.keys().cloned().collect();
        }

        Ok(TableData { columns, rows })
    }

    /// Query for a single scalar value
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if query execution fails or no row is returned.
    ///
    /// # Panics
    ///
    /// Panics if the internal database mutex is poisoned.
    pub fn query_scalar<T: duckdb::types::FromSql>(&self, sql: &str) -> Result<T, StoreError> {
        let conn = self.conn.lock().unwrap();
        let value: T = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(value)
    }

    /// Get database path
    #[must_use]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

/// Column names for a query that returned no rows, via `DESCRIBE`.
/// Best effort: an unexplainable query yields an empty column list.
fn describe_columns(conn: &Connection, sql: &str) -> Vec<String> {
    let describe = format!("DESCRIBE {sql}");
    let Ok(mut stmt) = conn.prepare(&describe) else {
        return Vec::new();
    };
    let Ok(mut rows) = stmt.query([]) else {
        return Vec::new();
    };

    let mut columns = Vec::new();
    while let Ok(Some(row)) = rows.next() {
        if let Ok(name) = row.get::<_, String>(0) {
            columns.push(name);
        }
    }
    columns
}

/// Escape a string for inclusion in a single-quoted SQL literal
#[must_use]
pub fn escape_sql_literal(value: &str) -> String {
    value.replace('\'', "''")
}

// ============================================================================
// Tests
// ============================================================================
