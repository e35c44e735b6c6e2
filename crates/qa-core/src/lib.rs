//! qa-core - Core library for the QA platform
//!
//! This crate provides the domain model (projects, requirements, scenarios,
//! test cases, automation scripts, executions), their lifecycle rules,
//! coverage and metric aggregation, the traceability graph, configuration
//! parsing, and the [`Ledger`] that owns all of it.

pub mod audit;
pub mod checksum;
pub mod config;
pub mod coverage;
pub mod error;
pub mod execution;
pub mod history;
pub mod ids;
pub mod ledger;
pub mod lifecycle;
pub mod metrics;
mod newtype_string;
pub mod project;
pub mod receipt;
pub mod requirement;
pub mod scenario;
pub mod script;
mod status_enum;
pub mod test_case;
pub mod trace;
pub mod version;

pub use audit::{AuditEvent, EntityKind};
pub use checksum::compute_checksum;
pub use config::Config;
pub use coverage::Coverage;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use execution::{
    Execution, ExecutionResult, ExecutionStatus, ExecutionSummary, FailureCategory, PlannedRun,
    ResultInput, ResultStatus,
};
pub use history::{VersionHistory, Versioned};
pub use ids::{
    ExecutionId, IdSequences, ProjectId, RequestToken, RequirementId, ResultId, ScenarioId,
    ScriptId, TestCaseId,
};
pub use ledger::{IntegrityIssue, Ledger, LedgerParts};
pub use metrics::{DashboardMetrics, PendingApprovals, ProjectSummary};
pub use project::{
    GenerationSettings, Member, MemberRole, NewProject, Project, ProjectStatus, PromptTemplates,
};
pub use receipt::{Operation, Receipt, ReceiptCheck, ReceiptState, RequestKey};
pub use requirement::{
    AnalysisOutcome, CoverageStatus, DetectedIssue, IssueKind, IssueSeverity, NewRequirement,
    Requirement, RequirementAnalysis, RequirementRevision, RequirementStatus,
};
pub use scenario::{Origin, ScenarioDraft, ScenarioStatus, ScenarioType, TestScenario};
pub use script::{
    AutomationScript, Framework, Language, ScriptDraft, ScriptStatus, ValidationResult,
    ValidationStatus,
};
pub use test_case::{
    Priority, StepDraft, TestCase, TestCaseDraft, TestCaseStatus, TestStep, TestType,
};
pub use trace::{TraceGraph, TraceNode};
pub use version::Version;
