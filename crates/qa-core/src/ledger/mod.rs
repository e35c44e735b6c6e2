//! The ledger: single-writer store of every entity, its version history,
//! the audit log and generation receipts.
//!
//! All mutation goes through `&mut Ledger`. Each operation validates its
//! input and preconditions before touching state, so a failed call leaves
//! the ledger unchanged. Persistence lives in `qa-meta`, which round-trips
//! a ledger through [`LedgerParts`].

mod executions;
mod integrity;
mod projects;
mod receipts;
mod reports;
mod requirements;
mod scenarios;
mod scripts;
mod test_cases;

pub use integrity::IntegrityIssue;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::audit::{AuditEvent, EntityKind};
use crate::error::{CoreError, CoreResult};
use crate::execution::Execution;
use crate::history::VersionHistory;
use crate::ids::{
    ExecutionId, IdSequences, ProjectId, RequestToken, RequirementId, ScenarioId, ScriptId,
    TestCaseId,
};
use crate::project::Project;
use crate::receipt::Receipt;
use crate::requirement::Requirement;
use crate::scenario::TestScenario;
use crate::script::AutomationScript;
use crate::test_case::TestCase;
use crate::version::Version;

/// Actor recorded when none is configured
pub const DEFAULT_ACTOR: &str = "system";

/// In-memory store of all QA entities
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Store revision this ledger was loaded from
    revision: u64,
    dirty: bool,
    actor: String,
    sequences: IdSequences,
    projects: BTreeMap<ProjectId, Project>,
    requirements: BTreeMap<RequirementId, VersionHistory<Requirement>>,
    scenarios: BTreeMap<ScenarioId, TestScenario>,
    test_cases: BTreeMap<TestCaseId, VersionHistory<TestCase>>,
    scripts: BTreeMap<ScriptId, VersionHistory<AutomationScript>>,
    executions: BTreeMap<ExecutionId, Execution>,
    receipts: BTreeMap<RequestToken, Receipt>,
    audit: Vec<AuditEvent>,
}

/// Flat, owned view of a ledger used for persistence.
///
/// Versioned entities list every version, not just the current one.
#[derive(Debug, Clone, Default)]
pub struct LedgerParts {
    pub revision: u64,
    pub sequences: IdSequences,
    pub projects: Vec<Project>,
    pub requirements: Vec<Requirement>,
    pub scenarios: Vec<TestScenario>,
    pub test_cases: Vec<TestCase>,
    pub scripts: Vec<AutomationScript>,
    pub executions: Vec<Execution>,
    pub receipts: Vec<Receipt>,
    pub audit: Vec<AuditEvent>,
}

/// Status change recorded on an audit event
#[derive(Debug, Clone, Default)]
pub(crate) struct Transition {
    from: Option<String>,
    to: Option<String>,
}

impl Transition {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn created(to: impl ToString) -> Self {
        Self {
            from: None,
            to: Some(to.to_string()),
        }
    }

    pub(crate) fn moved(from: impl ToString, to: impl ToString) -> Self {
        Self {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            revision: 0,
            dirty: false,
            actor: DEFAULT_ACTOR.to_string(),
            sequences: IdSequences::default(),
            projects: BTreeMap::new(),
            requirements: BTreeMap::new(),
            scenarios: BTreeMap::new(),
            test_cases: BTreeMap::new(),
            scripts: BTreeMap::new(),
            executions: BTreeMap::new(),
            receipts: BTreeMap::new(),
            audit: Vec::new(),
        }
    }

    /// Rebuild a ledger from persisted parts
    pub fn restore(parts: LedgerParts) -> CoreResult<Self> {
        let mut ledger = Self::new();
        ledger.revision = parts.revision;
        ledger.sequences = parts.sequences;
        ledger.projects = parts
            .projects
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        ledger.requirements = group_versions(parts.requirements, |r| r.id.clone())?;
        ledger.scenarios = parts
            .scenarios
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        ledger.test_cases = group_versions(parts.test_cases, |c| c.id.clone())?;
        ledger.scripts = group_versions(parts.scripts, |s| s.id.clone())?;
        ledger.executions = parts
            .executions
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();
        ledger.receipts = parts
            .receipts
            .into_iter()
            .map(|r| (r.token.clone(), r))
            .collect();
        ledger.audit = parts.audit;
        ledger.audit.sort_by_key(|e| e.seq);
        log::debug!(
            "restored ledger at revision {} ({} requirements, {} test cases)",
            ledger.revision,
            ledger.requirements.len(),
            ledger.test_cases.len()
        );
        Ok(ledger)
    }

    /// Flatten into owned parts for persistence
    pub fn to_parts(&self) -> LedgerParts {
        LedgerParts {
            revision: self.revision,
            sequences: self.sequences.clone(),
            projects: self.projects.values().cloned().collect(),
            requirements: flatten(&self.requirements),
            scenarios: self.scenarios.values().cloned().collect(),
            test_cases: flatten(&self.test_cases),
            scripts: flatten(&self.scripts),
            executions: self.executions.values().cloned().collect(),
            receipts: self.receipts.values().cloned().collect(),
            audit: self.audit.clone(),
        }
    }

    /// Store revision this ledger was loaded from or last saved as
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether anything changed since load or the last save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that the ledger was persisted as `revision`
    pub fn mark_saved(&mut self, revision: u64) {
        self.revision = revision;
        self.dirty = false;
    }

    /// Set the actor recorded on subsequent audit events
    pub fn set_actor(&mut self, actor: impl Into<String>) {
        self.actor = actor.into();
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Audit events in order
    pub fn audit_log(&self) -> &[AuditEvent] {
        &self.audit
    }

    /// Audit events for one entity
    pub fn audit_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a AuditEvent> + 'a {
        self.audit.iter().filter(move |e| e.entity_id == id)
    }

    pub(crate) fn record(
        &mut self,
        now: DateTime<Utc>,
        entity: EntityKind,
        id: &str,
        action: &str,
        transition: Transition,
        version: Option<Version>,
    ) {
        let seq = self.audit.last().map_or(1, |e| e.seq + 1);
        log::debug!(
            "{entity} {id}: {action}{}",
            transition
                .to
                .as_deref()
                .map(|to| format!(" -> {to}"))
                .unwrap_or_default()
        );
        self.audit.push(AuditEvent {
            seq,
            at: now,
            actor: self.actor.clone(),
            entity,
            entity_id: id.to_string(),
            action: action.to_string(),
            from_status: transition.from,
            to_status: transition.to,
            version,
        });
        self.dirty = true;
    }
}

/// Fail with a conflict when the caller's expected version is stale
pub(crate) fn check_expected(
    entity: &str,
    id: &str,
    current: Version,
    expected: Option<Version>,
) -> CoreResult<()> {
    match expected {
        Some(expected) if expected != current => Err(CoreError::conflict(
            entity,
            id,
            format!("expected {expected}, current version is {current}"),
        )),
        _ => Ok(()),
    }
}

fn group_versions<K: Ord, T: crate::history::Versioned>(
    items: Vec<T>,
    key: impl Fn(&T) -> K,
) -> CoreResult<BTreeMap<K, VersionHistory<T>>> {
    let mut grouped: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        grouped.entry(key(&item)).or_default().push(item);
    }
    grouped
        .into_iter()
        .map(|(k, versions)| Ok((k, VersionHistory::from_versions(versions)?)))
        .collect()
}

fn flatten<K, T: Clone + crate::history::Versioned>(
    map: &BTreeMap<K, VersionHistory<T>>,
) -> Vec<T> {
    map.values()
        .flat_map(|h| h.versions().iter().cloned())
        .collect()
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
