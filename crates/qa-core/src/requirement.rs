//! Requirements and their analysis output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use crate::ids::{ProjectId, RequirementId};
use crate::status_enum::define_status_enum;
use crate::version::Version;

define_status_enum! {
    /// Requirement lifecycle status
    pub enum RequirementStatus {
        Draft => "draft",
        ClarificationRequired => "clarification-required",
        Ready => "ready",
        ScenariosGenerated => "scenarios-generated",
        TestCasesGenerated => "test-cases-generated",
        Approved => "approved",
        /// Terminal, one-way
        Archived => "archived",
    }
}

define_status_enum! {
    /// How completely a requirement's scenarios are backed by approved test cases
    pub enum CoverageStatus {
        NotGenerated => "not-generated",
        Partial => "partial",
        Complete => "complete",
    }
}

impl Default for CoverageStatus {
    fn default() -> Self {
        CoverageStatus::NotGenerated
    }
}

define_status_enum! {
    /// Category of a problem found while analyzing a requirement
    pub enum IssueKind {
        AmbiguousLanguage => "ambiguous-language",
        MissingAcceptanceCriteria => "missing-acceptance-criteria",
        LogicalConflict => "logical-conflict",
    }
}

define_status_enum! {
    /// Severity of a detected issue; any `error` blocks the requirement
    pub enum IssueSeverity {
        Warning => "warning",
        Error => "error",
    }
}

/// A problem found in the requirement text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub description: String,
    pub suggestion: String,
}

/// Structured breakdown of a requirement produced by the analyze step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementAnalysis {
    #[serde(default)]
    pub functional_flows: Vec<String>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub postconditions: Vec<String>,
    #[serde(default)]
    pub business_rules: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub authentication_requirements: Vec<String>,
    #[serde(default)]
    pub validation_rules: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// Outcome of analyzing one requirement version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub analysis: RequirementAnalysis,
    pub issues: Vec<DetectedIssue>,
}

impl AnalysisOutcome {
    /// Whether a human must clarify the requirement before generation
    pub fn needs_clarification(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error)
    }
}

/// A unit of specified behavior to be tested, scoped to a release.
///
/// `linked_test_cases` and `coverage_status` are cached summaries over the
/// requirement's scenarios and test cases; the ledger refreshes them on
/// every child mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RequirementId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    pub release: String,
    pub owner: String,
    pub status: RequirementStatus,
    pub version: Version,
    #[serde(default)]
    pub analysis: Option<RequirementAnalysis>,
    #[serde(default)]
    pub issues: Vec<DetectedIssue>,
    #[serde(default)]
    pub clarifications: Vec<String>,
    pub linked_test_cases: usize,
    pub coverage_status: CoverageStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Requirement {
    /// Checksum over the fields that define the requirement's content
    pub fn content_checksum(&self) -> String {
        content_checksum(
            &self.title,
            &self.description,
            &self.acceptance_criteria,
            &self.release,
        )
    }

    /// Full text handed to the analysis backend
    pub fn full_text(&self) -> String {
        let mut text = format!("{}\n\n{}", self.title, self.description);
        if !self.acceptance_criteria.is_empty() {
            text.push_str("\n\nAcceptance criteria:\n");
            for criterion in &self.acceptance_criteria {
                text.push_str("- ");
                text.push_str(criterion);
                text.push('\n');
            }
        }
        for clarification in &self.clarifications {
            text.push_str("\nClarification: ");
            text.push_str(clarification);
        }
        text
    }
}

fn content_checksum(title: &str, description: &str, criteria: &[String], release: &str) -> String {
    let mut buf = String::new();
    buf.push_str(title.trim());
    buf.push('\u{1f}');
    buf.push_str(description.trim());
    buf.push('\u{1f}');
    for c in criteria {
        buf.push_str(c.trim());
        buf.push('\u{1e}');
    }
    buf.push('\u{1f}');
    buf.push_str(release.trim());
    compute_checksum(&buf)
}

/// Input for ingesting a requirement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewRequirement {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub owner: String,
}

impl NewRequirement {
    pub fn validate(&self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::validation("requirement", "title is required"));
        }
        if self.description.trim().is_empty() {
            return Err(CoreError::validation(
                "requirement",
                "description is required",
            ));
        }
        if self.acceptance_criteria.iter().any(|c| c.trim().is_empty()) {
            return Err(CoreError::validation(
                "requirement",
                "acceptance criteria must not be blank",
            ));
        }
        Ok(())
    }
}

/// A content edit to an existing requirement; unset fields keep their value
#[derive(Debug, Clone, Default)]
pub struct RequirementRevision {
    pub title: Option<String>,
    pub description: Option<String>,
    pub acceptance_criteria: Option<Vec<String>>,
    pub release: Option<String>,
}

impl RequirementRevision {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.acceptance_criteria.is_none()
            && self.release.is_none()
    }

    /// Apply the edit to a copy of `current`, returning it when content changed
    pub(crate) fn apply(&self, current: &Requirement) -> CoreResult<Option<Requirement>> {
        let mut next = current.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(criteria) = &self.acceptance_criteria {
            next.acceptance_criteria = criteria.clone();
        }
        if let Some(release) = &self.release {
            next.release = release.clone();
        }
        NewRequirement {
            title: next.title.clone(),
            description: next.description.clone(),
            acceptance_criteria: next.acceptance_criteria.clone(),
            release: next.release.clone(),
            owner: next.owner.clone(),
        }
        .validate()?;

        if next.content_checksum() == current.content_checksum() {
            return Ok(None);
        }
        Ok(Some(next))
    }
}
