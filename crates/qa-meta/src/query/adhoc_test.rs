use super::*;
use crate::MetaDb;

fn open_meta() -> MetaDb {
    MetaDb::open_memory().unwrap()
}

#[test]
fn execute_simple_query() {
    let meta = open_meta();
    let result = execute_query(meta.conn(), "SELECT 42 AS answer, 'hello' AS greeting").unwrap();

    assert_eq!(result.columns, vec!["answer", "greeting"]);
    assert_eq!(result.rows, vec![vec!["42", "hello"]]);
}

#[test]
fn execute_renders_nulls_and_booleans() {
    let meta = open_meta();
    let result = execute_query(meta.conn(), "SELECT NULL AS nothing, true AS yes").unwrap();
    assert_eq!(result.rows[0], vec!["null", "true"]);
}

#[test]
fn execute_empty_result() {
    let meta = open_meta();
    let result = execute_query(meta.conn(), "SELECT 1 WHERE false").unwrap();

    assert!(result.rows.is_empty());
}

#[test]
fn execute_invalid_sql_returns_error() {
    let meta = open_meta();
    assert!(execute_query(meta.conn(), "SELECT * FROM qa_meta.no_such_table").is_err());
}

#[test]
fn writes_are_refused() {
    let meta = open_meta();
    for sql in [
        "DELETE FROM qa_meta.projects",
        "drop table qa_meta.receipts",
        "SELECT 1; DELETE FROM qa_meta.projects",
    ] {
        let err = execute_query(meta.conn(), sql).unwrap_err();
        assert!(err.to_string().contains("read-only"), "{sql}: {err}");
    }
    assert!(execute_query(meta.conn(), "  with t AS (SELECT 1 AS n) SELECT n FROM t;").is_ok());
}

#[test]
fn list_tables_returns_meta_tables_and_views() {
    let meta = open_meta();
    let tables = list_tables(meta.conn()).unwrap();

    for name in ["projects", "requirement_versions", "receipts", "v_coverage"] {
        assert!(tables.contains(&name.to_string()), "missing {name}");
    }
}

#[test]
fn table_row_count_rejects_bad_names() {
    let meta = open_meta();
    assert_eq!(table_row_count(meta.conn(), "projects").unwrap(), 0);
    assert!(table_row_count(meta.conn(), "projects; DROP TABLE x").is_err());
}
