//! Meta database for the QA platform.
//!
//! Provides a DuckDB-backed store at `<target>/meta.duckdb` that persists the
//! [`qa_core::Ledger`] between CLI invocations, guards concurrent writers
//! with an optimistic revision check, and exposes the stored records to
//! ad-hoc SQL.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod migration;
pub mod query;
pub mod store;

pub use connection::MetaDb;
pub use error::{MetaError, MetaResult};
pub use query::{execute_query, list_tables, table_row_count, QueryResult};
