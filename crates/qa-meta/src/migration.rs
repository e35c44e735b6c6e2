//! Brings a ledger store up to the schema this build expects.
//!
//! Applied steps are listed in `qa_meta.schema_version`; opening a store
//! replays whatever is missing, each step together with its bookkeeping row
//! in one transaction.

use crate::ddl::{latest_version, Migration, MIGRATIONS};
use crate::error::{MetaError, MetaResult};
use duckdb::{params, Connection};

const BOOKKEEPING: &str = "CREATE SCHEMA IF NOT EXISTS qa_meta;
CREATE TABLE IF NOT EXISTS qa_meta.schema_version (
    version    INTEGER NOT NULL,
    name       VARCHAR,
    applied_at TIMESTAMP NOT NULL DEFAULT now()
);";

/// Schema number recorded in the store, 0 when nothing has been applied.
pub fn current_version(conn: &Connection) -> MetaResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM qa_meta.schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| MetaError::Migration(format!("schema_version is unreadable: {e}")))
}

fn apply(conn: &Connection, step: &Migration) -> MetaResult<()> {
    log::debug!("schema v{:03}: {}", step.version, step.name);
    let outcome = conn.execute_batch("BEGIN TRANSACTION").and_then(|()| {
        conn.execute_batch(step.sql)?;
        conn.execute(
            "INSERT INTO qa_meta.schema_version (version, name) VALUES (?, ?)",
            params![step.version, step.name],
        )?;
        conn.execute_batch("COMMIT")
    });
    outcome.map_err(|e| {
        // a failed COMMIT or step leaves the transaction open
        let _ = conn.execute_batch("ROLLBACK");
        MetaError::Migration(format!("v{:03} ({}) failed: {e}", step.version, step.name))
    })
}

/// Apply every step newer than the store's recorded schema.
///
/// A store written by a newer build is refused rather than downgraded.
pub fn run_migrations(conn: &Connection) -> MetaResult<()> {
    conn.execute_batch(BOOKKEEPING)
        .map_err(|e| MetaError::Migration(format!("cannot create schema_version: {e}")))?;

    let recorded = current_version(conn)?;
    let known = latest_version();
    if recorded > known {
        return Err(MetaError::Migration(format!(
            "store was written with schema v{recorded:03} but this qa knows up to v{known:03}; \
             upgrade qa to open it"
        )));
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > recorded).collect();
    if pending.is_empty() {
        return Ok(());
    }
    for step in pending {
        apply(conn, step)?;
    }
    log::info!("ledger store upgraded from schema v{recorded:03} to v{known:03}");
    Ok(())
}
