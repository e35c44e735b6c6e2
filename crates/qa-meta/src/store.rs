//! Ledger persistence.
//!
//! The meta database holds one snapshot of the ledger at a time. A save
//! rewrites every snapshot table inside a single transaction and appends a
//! row to `ledger_revisions`. Saving is optimistic: the ledger remembers the
//! revision it was loaded from, and a save fails with
//! [`CoreError::RevisionConflict`] when another writer committed first.

use crate::connection::MetaDb;
use crate::error::{MetaError, MetaResult};
use duckdb::{params, Connection};
use qa_core::{CoreError, IdSequences, Ledger, LedgerParts};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Tables rewritten on every save.
const SNAPSHOT_TABLES: &[&str] = &[
    "audit_events",
    "receipts",
    "execution_results",
    "executions",
    "script_versions",
    "test_case_versions",
    "scenarios",
    "requirement_versions",
    "projects",
    "id_sequences",
];

impl MetaDb {
    /// Revision of the most recent save, 0 for a fresh database.
    pub fn head_revision(&self) -> MetaResult<u64> {
        head_revision(self.conn())
    }

    /// Load the ledger saved at the head revision.
    pub fn load_ledger(&self) -> MetaResult<Ledger> {
        let conn = self.conn();
        let parts = LedgerParts {
            revision: head_revision(conn)?,
            sequences: load_sequences(conn)?,
            projects: load_bodies(
                conn,
                "project",
                "SELECT project_id, body FROM qa_meta.projects ORDER BY project_id",
            )?,
            requirements: load_bodies(
                conn,
                "requirement",
                "SELECT requirement_id, body FROM qa_meta.requirement_versions \
                 ORDER BY requirement_id, version",
            )?,
            scenarios: load_bodies(
                conn,
                "scenario",
                "SELECT scenario_id, body FROM qa_meta.scenarios ORDER BY scenario_id",
            )?,
            test_cases: load_bodies(
                conn,
                "test case",
                "SELECT test_case_id, body FROM qa_meta.test_case_versions \
                 ORDER BY test_case_id, version",
            )?,
            scripts: load_bodies(
                conn,
                "script",
                "SELECT script_id, body FROM qa_meta.script_versions ORDER BY script_id, version",
            )?,
            executions: load_bodies(
                conn,
                "execution",
                "SELECT execution_id, body FROM qa_meta.executions ORDER BY execution_id",
            )?,
            receipts: load_bodies(
                conn,
                "receipt",
                "SELECT token, body FROM qa_meta.receipts ORDER BY token",
            )?,
            audit: load_bodies(
                conn,
                "audit event",
                "SELECT CAST(seq AS VARCHAR), body FROM qa_meta.audit_events ORDER BY seq",
            )?,
        };
        Ok(Ledger::restore(parts)?)
    }

    /// Save `ledger` as the next revision and mark it clean.
    ///
    /// A ledger with no unsaved changes is left alone and its revision
    /// returned.
    pub fn save_ledger(&self, ledger: &mut Ledger) -> MetaResult<u64> {
        if !ledger.is_dirty() {
            return Ok(ledger.revision());
        }
        let parts = ledger.to_parts();
        let actor = ledger.actor().to_string();
        let revision = self.transaction(|conn| {
            let head = head_revision(conn)?;
            if head != parts.revision {
                return Err(CoreError::RevisionConflict {
                    expected: parts.revision,
                    found: head,
                }
                .into());
            }
            for table in SNAPSHOT_TABLES {
                conn.execute_batch(&format!("DELETE FROM qa_meta.{table}"))
                    .map_err(|e| MetaError::Query(format!("clearing {table} failed: {e}")))?;
            }
            write_parts(conn, &parts)?;
            let next = head + 1;
            conn.execute(
                "INSERT INTO qa_meta.ledger_revisions (revision, actor) VALUES (?, ?)",
                params![to_i64(next), actor],
            )?;
            Ok(next)
        })?;
        ledger.mark_saved(revision);
        log::debug!("saved ledger revision {revision}");
        Ok(revision)
    }
}

fn head_revision(conn: &Connection) -> MetaResult<u64> {
    let head: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(revision), 0) FROM qa_meta.ledger_revisions",
            [],
            |row| row.get(0),
        )
        .map_err(|e| MetaError::Query(format!("failed to read ledger revision: {e}")))?;
    Ok(u64::try_from(head).unwrap_or(0))
}

fn to_i64<T: TryInto<i64>>(n: T) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}

fn body<T: Serialize>(entity: &str, id: &str, value: &T) -> MetaResult<String> {
    serde_json::to_string(value).map_err(|e| MetaError::CorruptRecord {
        entity: entity.to_string(),
        id: id.to_string(),
        message: e.to_string(),
    })
}

fn load_bodies<T: DeserializeOwned>(
    conn: &Connection,
    entity: &str,
    sql: &str,
) -> MetaResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(id, body)| {
            serde_json::from_str(&body).map_err(|e| MetaError::CorruptRecord {
                entity: entity.to_string(),
                id,
                message: e.to_string(),
            })
        })
        .collect()
}

fn load_sequences(conn: &Connection) -> MetaResult<IdSequences> {
    let mut stmt = conn.prepare("SELECT name, value FROM qa_meta.id_sequences")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Ok(IdSequences::default());
    }
    let map: serde_json::Map<String, serde_json::Value> = rows
        .into_iter()
        .map(|(name, value)| (name, serde_json::Value::from(value)))
        .collect();
    serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| MetaError::CorruptRecord {
        entity: "id sequences".to_string(),
        id: "id_sequences".to_string(),
        message: e.to_string(),
    })
}

fn write_parts(conn: &Connection, parts: &LedgerParts) -> MetaResult<()> {
    let sequences = serde_json::to_value(&parts.sequences).map_err(|e| MetaError::CorruptRecord {
        entity: "id sequences".to_string(),
        id: "id_sequences".to_string(),
        message: e.to_string(),
    })?;
    if let serde_json::Value::Object(map) = sequences {
        let mut stmt = conn.prepare("INSERT INTO qa_meta.id_sequences (name, value) VALUES (?, ?)")?;
        for (name, value) in map {
            stmt.execute(params![name, value.as_i64().unwrap_or(0)])?;
        }
    }

    let mut stmt = conn.prepare(
        "INSERT INTO qa_meta.projects (project_id, name, owner, release, status, body) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )?;
    for p in &parts.projects {
        stmt.execute(params![
            p.id.as_str(),
            p.name,
            p.owner,
            p.release,
            p.status.as_str(),
            body("project", &p.id, p)?,
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO qa_meta.requirement_versions \
         (requirement_id, version, project_id, title, status, coverage_status, linked_test_cases, body) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for r in &parts.requirements {
        stmt.execute(params![
            r.id.as_str(),
            r.version.number(),
            r.project_id.as_str(),
            r.title,
            r.status.as_str(),
            r.coverage_status.as_str(),
            to_i64(r.linked_test_cases),
            body("requirement", &r.id, r)?,
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO qa_meta.scenarios \
         (scenario_id, requirement_id, requirement_version, scenario_type, status, origin, body) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )?;
    for s in &parts.scenarios {
        stmt.execute(params![
            s.id.as_str(),
            s.requirement_id.as_str(),
            s.requirement_version.number(),
            s.scenario_type.as_str(),
            s.status.as_str(),
            s.origin.as_str(),
            body("scenario", &s.id, s)?,
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO qa_meta.test_case_versions \
         (test_case_id, version, scenario_id, requirement_id, title, priority, status, body) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for c in &parts.test_cases {
        stmt.execute(params![
            c.id.as_str(),
            c.version.number(),
            c.scenario_id.as_str(),
            c.requirement_id.as_str(),
            c.title,
            c.priority.as_str(),
            c.status.as_str(),
            body("test case", &c.id, c)?,
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO qa_meta.script_versions \
         (script_id, version, test_case_id, test_case_version, framework, language, status, body) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for s in &parts.scripts {
        stmt.execute(params![
            s.id.as_str(),
            s.version.number(),
            s.test_case_id.as_str(),
            s.test_case_version.number(),
            s.framework.as_str(),
            s.language.as_str(),
            s.status.as_str(),
            body("script", &s.id, s)?,
        ])?;
    }

    let mut exec_stmt = conn.prepare(
        "INSERT INTO qa_meta.executions \
         (execution_id, project_id, status, total, passed, failed, skipped, triggered_by, body) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    let mut result_stmt = conn.prepare(
        "INSERT INTO qa_meta.execution_results \
         (result_id, execution_id, test_case_id, script_id, status, duration_ms, retry_count, failure_category) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for e in &parts.executions {
        let summary = e.summary();
        exec_stmt.execute(params![
            e.id.as_str(),
            e.project_id.as_str(),
            e.status.as_str(),
            to_i64(summary.total),
            to_i64(summary.passed),
            to_i64(summary.failed),
            to_i64(summary.skipped),
            e.triggered_by,
            body("execution", &e.id, e)?,
        ])?;
        for r in e.results() {
            result_stmt.execute(params![
                r.id.as_str(),
                r.execution_id.as_str(),
                r.test_case_id.as_str(),
                r.script_id.as_str(),
                r.status.as_str(),
                to_i64(r.duration_ms),
                r.retry_count,
                r.failure_category.map(|c| c.as_str()),
            ])?;
        }
    }

    let mut stmt = conn.prepare(
        "INSERT INTO qa_meta.receipts \
         (token, operation, project_id, target, state, tokens_used, body) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )?;
    for r in &parts.receipts {
        stmt.execute(params![
            r.token.as_str(),
            r.operation.as_str(),
            r.project_id.as_str(),
            r.target,
            r.state.as_str(),
            to_i64(r.tokens_used),
            body("receipt", &r.token, r)?,
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO qa_meta.audit_events \
         (seq, \"at\", actor, entity, entity_id, action, from_status, to_status, version, body) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for a in &parts.audit {
        stmt.execute(params![
            to_i64(a.seq),
            a.at.to_rfc3339(),
            a.actor,
            a.entity.as_str(),
            a.entity_id,
            a.action,
            a.from_status,
            a.to_status,
            a.version.map(|v| v.number()),
            body("audit event", &a.seq.to_string(), a)?,
        ])?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
