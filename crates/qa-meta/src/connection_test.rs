use crate::ddl::{latest_version, MIGRATIONS};
use crate::migration::current_version;
use crate::{MetaDb, MetaError, MetaResult};

fn scalar(db: &MetaDb, sql: &str) -> i64 {
    db.conn().query_row(sql, [], |row| row.get(0)).unwrap()
}

fn relation_kind(db: &MetaDb, name: &str) -> Option<String> {
    db.conn()
        .query_row(
            "SELECT table_type FROM information_schema.tables \
             WHERE table_schema = 'qa_meta' AND table_name = ?",
            [name],
            |row| row.get(0),
        )
        .ok()
}

fn rejected(db: &MetaDb, sql: &str) -> bool {
    db.conn().execute(sql, []).is_err()
}

#[test]
fn test_fresh_store_is_at_latest_schema() {
    let db = MetaDb::open_memory().unwrap();
    assert_eq!(current_version(db.conn()).unwrap(), latest_version());
    let named = scalar(
        &db,
        "SELECT COUNT(*) FROM qa_meta.schema_version WHERE name IS NOT NULL",
    );
    assert_eq!(named, MIGRATIONS.len() as i64);
}

#[test]
fn test_reopening_a_file_store_applies_nothing_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target").join("meta.duckdb");
    drop(MetaDb::open(&path).unwrap());
    assert!(path.exists());

    let db = MetaDb::open(&path).unwrap();
    assert_eq!(
        scalar(&db, "SELECT COUNT(*) FROM qa_meta.schema_version"),
        MIGRATIONS.len() as i64
    );
}

#[test]
fn test_store_from_a_newer_build_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.duckdb");
    {
        let db = MetaDb::open(&path).unwrap();
        db.conn()
            .execute("INSERT INTO qa_meta.schema_version (version) VALUES (999)", [])
            .unwrap();
    }
    match MetaDb::open(&path) {
        Err(err @ MetaError::Migration(_)) => {
            let text = err.to_string();
            assert!(text.contains("[M002]") && text.contains("v999"), "{text}");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema was accepted"),
    }
}

#[test]
fn test_snapshot_tables_and_reporting_views() {
    let db = MetaDb::open_memory().unwrap();
    let tables = [
        "ledger_revisions",
        "id_sequences",
        "projects",
        "requirement_versions",
        "scenarios",
        "test_case_versions",
        "script_versions",
        "executions",
        "execution_results",
        "receipts",
        "audit_events",
    ];
    for name in tables {
        assert_eq!(relation_kind(&db, name).as_deref(), Some("BASE TABLE"), "{name}");
    }
    for name in ["v_requirements", "v_test_cases", "v_scripts", "v_coverage"] {
        assert_eq!(relation_kind(&db, name).as_deref(), Some("VIEW"), "{name}");
    }
}

#[test]
fn test_transaction_keeps_writes_only_on_success() {
    let db = MetaDb::open_memory().unwrap();
    let kept = db
        .transaction(|conn| {
            conn.execute(
                "INSERT INTO qa_meta.id_sequences (name, value) VALUES ('requirement', 4)",
                [],
            )?;
            Ok(4)
        })
        .unwrap();
    assert_eq!(kept, 4);

    let failed: MetaResult<()> = db.transaction(|conn| {
        conn.execute(
            "INSERT INTO qa_meta.id_sequences (name, value) VALUES ('script', 9)",
            [],
        )?;
        Err(MetaError::Query("aborted by test".into()))
    });
    assert!(matches!(failed, Err(MetaError::Query(_))));

    assert_eq!(scalar(&db, "SELECT COUNT(*) FROM qa_meta.id_sequences"), 1);
    // the connection is usable again after the rollback
    db.transaction(|_| Ok(())).unwrap();
}

#[test]
fn test_requirement_rows_are_constrained() {
    let db = MetaDb::open_memory().unwrap();
    db.conn()
        .execute(
            "INSERT INTO qa_meta.requirement_versions VALUES \
             ('REQ-001', 1, 'PROJ-001', 't', 'ready', 'not-generated', 0, '{}')",
            [],
        )
        .unwrap();
    // unknown status
    assert!(rejected(
        &db,
        "INSERT INTO qa_meta.requirement_versions VALUES \
         ('REQ-002', 1, 'PROJ-001', 't', 'done', 'not-generated', 0, '{}')",
    ));
    // versions start at 1
    assert!(rejected(
        &db,
        "INSERT INTO qa_meta.requirement_versions VALUES \
         ('REQ-003', 0, 'PROJ-001', 't', 'ready', 'not-generated', 0, '{}')",
    ));
}

#[test]
fn test_script_rows_only_accept_supported_targets() {
    let db = MetaDb::open_memory().unwrap();
    assert!(rejected(
        &db,
        "INSERT INTO qa_meta.script_versions VALUES \
         ('SCR-001', 1, 'TC-001', 1, 'selenium', 'python', 'draft', '{}')",
    ));
    assert!(rejected(
        &db,
        "INSERT INTO qa_meta.script_versions VALUES \
         ('SCR-001', 1, 'TC-001', 1, 'cypress', 'ruby', 'draft', '{}')",
    ));
}

#[test]
fn test_a_test_case_version_is_written_once() {
    let db = MetaDb::open_memory().unwrap();
    let row = "INSERT INTO qa_meta.test_case_versions VALUES \
               ('TC-001', 1, 'SCN-001', 'REQ-001', 't', 'high', 'draft', '{}')";
    db.conn().execute(row, []).unwrap();
    assert!(rejected(&db, row));
}
