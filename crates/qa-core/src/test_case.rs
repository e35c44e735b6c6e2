//! Test cases and their ordered steps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use crate::ids::{RequirementId, ScenarioId, TestCaseId};
use crate::status_enum::define_status_enum;
use crate::version::Version;

define_status_enum! {
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

define_status_enum! {
    pub enum TestType {
        Ui => "ui",
        Api => "api",
        Security => "security",
        Performance => "performance",
    }
}

define_status_enum! {
    /// Test case review status
    pub enum TestCaseStatus {
        Draft => "draft",
        Edited => "edited",
        Approved => "approved",
        /// Terminal for this version; superseded by editing
        Rejected => "rejected",
    }
}

impl TestCaseStatus {
    /// Awaiting a review decision
    pub fn is_pending(self) -> bool {
        matches!(self, TestCaseStatus::Draft | TestCaseStatus::Edited)
    }
}

/// One step of a test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    pub step_number: u32,
    pub action: String,
    #[serde(default)]
    pub expected_result: String,
    /// Capture a screenshot after this step
    #[serde(default)]
    pub take_snapshot: bool,
}

/// Step content before numbering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDraft {
    pub action: String,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default)]
    pub take_snapshot: bool,
}

impl StepDraft {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            expected_result: String::new(),
            take_snapshot: false,
        }
    }
}

/// Number steps densely from 1, dropping steps with a blank action.
pub fn number_steps(drafts: &[StepDraft]) -> Vec<TestStep> {
    drafts
        .iter()
        .filter(|d| !d.action.trim().is_empty())
        .enumerate()
        .map(|(i, d)| TestStep {
            step_number: i as u32 + 1,
            action: d.action.trim().to_string(),
            expected_result: d.expected_result.trim().to_string(),
            take_snapshot: d.take_snapshot,
        })
        .collect()
}

/// Check that step numbers are unique and run densely `1..=n` in order.
pub fn validate_steps(steps: &[TestStep]) -> CoreResult<()> {
    if steps.is_empty() {
        return Err(CoreError::validation(
            "test case",
            "at least one step is required",
        ));
    }
    for (i, step) in steps.iter().enumerate() {
        let expected = i as u32 + 1;
        if step.step_number != expected {
            return Err(CoreError::validation(
                "test case",
                format!(
                    "step numbers must run 1..={} in order; position {} has step {}",
                    steps.len(),
                    expected,
                    step.step_number
                ),
            ));
        }
        if step.action.trim().is_empty() {
            return Err(CoreError::validation(
                "test case",
                format!("step {} has no action", step.step_number),
            ));
        }
    }
    Ok(())
}

/// A concrete, steppable procedure realizing a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: TestCaseId,
    pub scenario_id: ScenarioId,
    pub requirement_id: RequirementId,
    pub title: String,
    pub priority: Priority,
    pub test_type: TestType,
    #[serde(default)]
    pub preconditions: Vec<String>,
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub expected_results: Vec<String>,
    #[serde(default)]
    pub postconditions: Vec<String>,
    pub status: TestCaseStatus,
    pub version: Version,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestCase {
    /// Checksum over the normalized content, ignoring status and version
    pub fn content_checksum(&self) -> String {
        TestCaseDraft::from(self).checksum()
    }
}

/// Test case content, as produced by a generator, entered manually, or
/// submitted as an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseDraft {
    pub title: String,
    pub priority: Priority,
    pub test_type: TestType,
    #[serde(default)]
    pub preconditions: Vec<String>,
    pub steps: Vec<StepDraft>,
    #[serde(default)]
    pub expected_results: Vec<String>,
    #[serde(default)]
    pub postconditions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TestCaseDraft {
    pub fn validate(&self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::validation("test case", "title is required"));
        }
        validate_steps(&number_steps(&self.steps))
    }

    pub(crate) fn checksum(&self) -> String {
        // serde_json output is deterministic for this struct (no maps)
        let json = serde_json::to_string(self).unwrap_or_default();
        compute_checksum(&json)
    }

    /// Copy of `case` with this draft's content and the given status
    pub(crate) fn apply_to(
        &self,
        case: &TestCase,
        status: TestCaseStatus,
        now: DateTime<Utc>,
    ) -> TestCase {
        TestCase {
            id: case.id.clone(),
            scenario_id: case.scenario_id.clone(),
            requirement_id: case.requirement_id.clone(),
            title: self.title.trim().to_string(),
            priority: self.priority,
            test_type: self.test_type,
            preconditions: self.preconditions.clone(),
            steps: number_steps(&self.steps),
            expected_results: self.expected_results.clone(),
            postconditions: self.postconditions.clone(),
            status,
            version: case.version.next(),
            tags: self.tags.clone(),
            created_at: case.created_at,
            updated_at: now,
        }
    }
}

impl From<&TestCase> for TestCaseDraft {
    fn from(case: &TestCase) -> Self {
        Self {
            title: case.title.clone(),
            priority: case.priority,
            test_type: case.test_type,
            preconditions: case.preconditions.clone(),
            steps: case
                .steps
                .iter()
                .map(|s| StepDraft {
                    action: s.action.clone(),
                    expected_result: s.expected_result.clone(),
                    take_snapshot: s.take_snapshot,
                })
                .collect(),
            expected_results: case.expected_results.clone(),
            postconditions: case.postconditions.clone(),
            tags: case.tags.clone(),
        }
    }
}

#[cfg(test)]
#[path = "test_case_test.rs"]
mod tests;
