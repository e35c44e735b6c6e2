//! Errors raised by the ledger store.

use qa_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    /// The database file could not be created or opened
    #[error("[M001] Cannot open ledger store: {0}")]
    Open(String),

    /// Stored schema is missing, newer than this build, or a step failed
    #[error("[M002] Ledger schema upgrade failed: {0}")]
    Migration(String),

    /// A statement was refused or failed to run
    #[error("[M003] Ledger store query rejected: {0}")]
    Query(String),

    /// BEGIN, COMMIT or ROLLBACK itself failed
    #[error("[M004] Ledger store transaction aborted: {0}")]
    Transaction(String),

    /// A stored JSON body does not decode into its entity
    #[error("[M005] Stored {entity} '{id}' is unreadable: {message}")]
    CorruptRecord {
        entity: String,
        id: String,
        message: String,
    },

    #[error("[M007] DuckDB driver error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Revision conflicts and restore failures surface as the ledger's own errors
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type MetaResult<T> = Result<T, MetaError>;
