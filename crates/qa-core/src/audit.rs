//! Append-only audit trail of ledger mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status_enum::define_status_enum;
use crate::version::Version;

define_status_enum! {
    /// Kind of entity an audit event refers to
    pub enum EntityKind {
        Project => "project",
        Requirement => "requirement",
        Scenario => "scenario",
        TestCase => "test-case",
        Script => "script",
        Execution => "execution",
    }
}

/// One recorded mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the log, starting at 1
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub entity: EntityKind,
    pub entity_id: String,
    pub action: String,
    #[serde(default)]
    pub from_status: Option<String>,
    #[serde(default)]
    pub to_status: Option<String>,
    #[serde(default)]
    pub version: Option<Version>,
}

impl AuditEvent {
    /// `from -> to` or just the target status
    pub fn transition(&self) -> String {
        match (&self.from_status, &self.to_status) {
            (Some(from), Some(to)) => format!("{from} -> {to}"),
            (None, Some(to)) => to.clone(),
            (Some(from), None) => from.clone(),
            (None, None) => String::new(),
        }
    }
}
