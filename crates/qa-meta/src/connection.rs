//! The ledger store handle.

use crate::error::{MetaError, MetaResult};
use crate::migration::run_migrations;
use duckdb::Connection;
use std::path::Path;

/// DuckDB database holding the saved ledger, usually `<target>/meta.duckdb`.
///
/// Every handle is migrated to the current schema before it is returned.
pub struct MetaDb {
    conn: Connection,
}

/// Rolls back on drop unless committed.
struct OpenTransaction<'a> {
    conn: &'a Connection,
    done: bool,
}

impl<'a> OpenTransaction<'a> {
    fn begin(conn: &'a Connection) -> MetaResult<Self> {
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| MetaError::Transaction(format!("cannot begin: {e}")))?;
        Ok(Self { conn, done: false })
    }

    fn commit(mut self) -> MetaResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| MetaError::Transaction(format!("commit refused: {e}")))?;
        self.done = true;
        Ok(())
    }
}

impl Drop for OpenTransaction<'_> {
    fn drop(&mut self) {
        if !self.done {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("rollback failed: {e}");
            }
        }
    }
}

impl MetaDb {
    fn migrated(conn: Connection) -> MetaResult<Self> {
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open the store at `path`, creating it and any missing directories.
    pub fn open(path: &Path) -> MetaResult<Self> {
        let describe = |e: &dyn std::fmt::Display| format!("{}: {e}", path.display());
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir).map_err(|e| MetaError::Open(describe(&e)))?
            }
            _ => {}
        }
        let conn = Connection::open(path).map_err(|e| MetaError::Open(describe(&e)))?;
        log::debug!("opened ledger store {}", path.display());
        Self::migrated(conn)
    }

    /// A throwaway in-memory store.
    pub fn open_memory() -> MetaResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MetaError::Open(format!("in-memory store: {e}")))?;
        Self::migrated(conn)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `body` in one transaction; an `Err` from `body` leaves nothing behind.
    pub fn transaction<T>(
        &self,
        body: impl FnOnce(&Connection) -> MetaResult<T>,
    ) -> MetaResult<T> {
        let tx = OpenTransaction::begin(&self.conn)?;
        let value = body(&self.conn)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
