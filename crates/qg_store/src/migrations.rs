//! Database migrations for qg_store

use crate::StoreError;
use crate::schema;
use duckdb::Connection;
use tracing::{debug, info};

/// Migration definition
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "customer_tables",
        sql: schema::CUSTOMER_TABLES_SQL,
    },
    Migration {
        version: 2,
        name: "crs_reference_tables",
        sql: schema::CRS_TABLES_SQL,
    },
];

/// Run all pending migrations
pub fn run_all(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT current_timestamp
        );
    ",
    )?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    debug!(current_version, "Checking migrations");

    for migration in MIGRATIONS {
        if i64::from(migration.version) > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );

            conn.execute_batch(migration.sql).map_err(|e| {
                StoreError::MigrationError(format!(
                    "Failed to apply migration {}: {}",
                    migration.name, e
                ))
            })?;

            conn.execute(
                "INSERT INTO _migrations (version, name) VALUES (?, ?)",
                [&migration.version.to_string(), &migration.name.to_string()],
            )?;
        }
    }

    Ok(())
}
