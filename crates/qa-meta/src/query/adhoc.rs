//! Read-only SQL over the saved ledger, as used by `qa meta`.

use crate::error::{MetaError, MetaResult};
use duckdb::types::ValueRef;
use duckdb::{Connection, Row};

/// Column names plus every row rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

const READ_ONLY_KEYWORDS: &[&str] = &["select", "with", "describe", "show", "explain", "summarize"];

/// Statements may only read; the snapshot changes through a ledger save alone.
fn ensure_read_only(sql: &str) -> MetaResult<()> {
    let body = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let keyword: String = body
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect::<String>()
        .to_ascii_lowercase();
    let single = !sql.trim_end_matches(|c: char| c.is_whitespace() || c == ';').contains(';');
    if single && READ_ONLY_KEYWORDS.contains(&keyword.as_str()) {
        return Ok(());
    }
    let first_line = body.lines().next().unwrap_or_default();
    Err(MetaError::Query(format!(
        "meta queries are read-only; expected one statement starting with {}, got '{first_line}'",
        READ_ONLY_KEYWORDS.join("/")
    )))
}

fn render(row: &Row<'_>, idx: usize) -> String {
    let value = match row.get_ref(idx) {
        Ok(value) => value,
        Err(e) => return format!("<{e}>"),
    };
    match value {
        ValueRef::Null => "null".into(),
        ValueRef::Boolean(b) => b.to_string(),
        ValueRef::Int(n) => n.to_string(),
        ValueRef::BigInt(n) => n.to_string(),
        ValueRef::HugeInt(n) => n.to_string(),
        ValueRef::Double(f) => f.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => row
            .get::<_, String>(idx)
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Run one read-only statement and return its rows as text.
pub fn execute_query(conn: &Connection, sql: &str) -> MetaResult<QueryResult> {
    ensure_read_only(sql)?;
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| MetaError::Query(format!("cannot prepare: {e}")))?;

    let mut rows = Vec::new();
    {
        let mut cursor = stmt
            .query([])
            .map_err(|e| MetaError::Query(format!("cannot run: {e}")))?;
        while let Some(row) = cursor
            .next()
            .map_err(|e| MetaError::Query(format!("cannot fetch row: {e}")))?
        {
            let width = row.as_ref().column_count();
            rows.push((0..width).map(|i| render(row, i)).collect());
        }
    }

    // column metadata is only available once the statement has run
    let columns = stmt
        .column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    Ok(QueryResult { columns, rows })
}

/// Tables and views in the `qa_meta` schema, by name.
pub fn list_tables(conn: &Connection) -> MetaResult<Vec<String>> {
    let listed = execute_query(
        conn,
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'qa_meta' ORDER BY table_name",
    )?;
    Ok(listed.rows.into_iter().flatten().collect())
}

pub fn table_row_count(conn: &Connection, table_name: &str) -> MetaResult<i64> {
    let valid = !table_name.is_empty()
        && table_name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        return Err(MetaError::Query(format!(
            "'{table_name}' is not a qa_meta table name"
        )));
    }
    let sql = format!("SELECT COUNT(*) FROM qa_meta.{table_name}");
    conn.query_row(&sql, [], |row| row.get(0))
        .map_err(|e| MetaError::Query(format!("cannot count {table_name}: {e}")))
}

#[cfg(test)]
#[path = "adhoc_test.rs"]
mod tests;
