//! Status state machines for requirements, scenarios, test cases and scripts
//!
//! Each entity has a closed set of actions. An action lists the states it may
//! start from; any other starting state fails with
//! [`CoreError::PreconditionNotMet`] naming the states that would have been
//! accepted.

use std::fmt::Display;

use crate::error::{CoreError, CoreResult};
use crate::requirement::RequirementStatus;
use crate::scenario::ScenarioStatus;
use crate::script::ScriptStatus;
use crate::test_case::TestCaseStatus;

/// Build a [`CoreError::PreconditionNotMet`].
pub fn precondition<S: Display>(
    entity: &str,
    id: impl Display,
    action: &str,
    actual: impl Display,
    required: &[S],
) -> CoreError {
    let required = required
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    CoreError::PreconditionNotMet {
        entity: entity.to_string(),
        id: id.to_string(),
        action: action.to_string(),
        actual: actual.to_string(),
        required,
    }
}

fn check<S: Copy + PartialEq + Display>(
    entity: &str,
    id: impl Display,
    action: &str,
    from: S,
    allowed: &[S],
) -> CoreResult<()> {
    if allowed.contains(&from) {
        Ok(())
    } else {
        Err(precondition(entity, id, action, from, allowed))
    }
}

// ── Requirement ────────────────────────────────────────────────────────

/// Actions that move a requirement through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementAction {
    /// Analysis finished; `needs_clarification` when an error-severity issue was found
    Analyze { needs_clarification: bool },
    ResolveClarification,
    GenerateScenarios,
    /// Also used to fill in scenarios added after the first generation
    GenerateTestCases,
    Approve,
    /// Content edit; the new version goes back through analysis
    Revise,
    Archive,
}

const NOT_ARCHIVED: &[RequirementStatus] = &[
    RequirementStatus::Draft,
    RequirementStatus::ClarificationRequired,
    RequirementStatus::Ready,
    RequirementStatus::ScenariosGenerated,
    RequirementStatus::TestCasesGenerated,
    RequirementStatus::Approved,
];

/// Requirement states in which its test cases may be reviewed
pub const REVIEWABLE_REQUIREMENT: &[RequirementStatus] = &[
    RequirementStatus::ScenariosGenerated,
    RequirementStatus::TestCasesGenerated,
    RequirementStatus::Approved,
];

impl RequirementAction {
    pub fn name(self) -> &'static str {
        match self {
            RequirementAction::Analyze { .. } => "analyze",
            RequirementAction::ResolveClarification => "resolve clarification for",
            RequirementAction::GenerateScenarios => "generate scenarios for",
            RequirementAction::GenerateTestCases => "generate test cases for",
            RequirementAction::Approve => "approve",
            RequirementAction::Revise => "revise",
            RequirementAction::Archive => "archive",
        }
    }

    /// States this action may start from
    pub fn allowed_from(self) -> &'static [RequirementStatus] {
        match self {
            RequirementAction::Analyze { .. } => &[RequirementStatus::Draft],
            RequirementAction::ResolveClarification => {
                &[RequirementStatus::ClarificationRequired]
            }
            RequirementAction::GenerateScenarios => &[RequirementStatus::Ready],
            RequirementAction::GenerateTestCases => &[
                RequirementStatus::ScenariosGenerated,
                RequirementStatus::TestCasesGenerated,
            ],
            RequirementAction::Approve => &[RequirementStatus::TestCasesGenerated],
            RequirementAction::Revise | RequirementAction::Archive => NOT_ARCHIVED,
        }
    }

    fn target(self) -> RequirementStatus {
        match self {
            RequirementAction::Analyze {
                needs_clarification: true,
            } => RequirementStatus::ClarificationRequired,
            RequirementAction::Analyze {
                needs_clarification: false,
            }
            | RequirementAction::ResolveClarification => RequirementStatus::Ready,
            RequirementAction::GenerateScenarios => RequirementStatus::ScenariosGenerated,
            RequirementAction::GenerateTestCases => RequirementStatus::TestCasesGenerated,
            RequirementAction::Approve => RequirementStatus::Approved,
            RequirementAction::Revise => RequirementStatus::Draft,
            RequirementAction::Archive => RequirementStatus::Archived,
        }
    }
}

/// Validate a requirement transition and return the resulting status.
pub fn requirement_transition(
    id: impl Display,
    from: RequirementStatus,
    action: RequirementAction,
) -> CoreResult<RequirementStatus> {
    check("requirement", id, action.name(), from, action.allowed_from())?;
    Ok(action.target())
}

/// Actions available from `from`, for display
pub fn requirement_next_actions(from: RequirementStatus) -> Vec<&'static str> {
    let actions = [
        RequirementAction::Analyze {
            needs_clarification: false,
        },
        RequirementAction::ResolveClarification,
        RequirementAction::GenerateScenarios,
        RequirementAction::GenerateTestCases,
        RequirementAction::Approve,
        RequirementAction::Revise,
        RequirementAction::Archive,
    ];
    actions
        .into_iter()
        .filter(|a| a.allowed_from().contains(&from))
        .map(|a| a.name().trim_end_matches(" for"))
        .collect()
}

// ── Scenario ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioAction {
    Approve,
    Edit,
}

pub fn scenario_transition(
    id: impl Display,
    from: ScenarioStatus,
    action: ScenarioAction,
) -> CoreResult<ScenarioStatus> {
    match action {
        ScenarioAction::Approve => {
            check("scenario", id, "approve", from, &[ScenarioStatus::Draft])?;
            Ok(ScenarioStatus::Approved)
        }
        ScenarioAction::Edit => {
            check("scenario", id, "edit", from, &[ScenarioStatus::Draft])?;
            Ok(ScenarioStatus::Draft)
        }
    }
}

// ── Test case ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCaseAction {
    Approve,
    Reject,
    /// Content edit; always produces a new version
    Edit,
}

/// Validate a test case transition and return the resulting status.
///
/// Editing a pending case yields `edited`; editing an approved or rejected
/// case forks a new version back in `draft`, leaving the reviewed version
/// untouched.
pub fn test_case_transition(
    id: impl Display,
    from: TestCaseStatus,
    action: TestCaseAction,
) -> CoreResult<TestCaseStatus> {
    const PENDING: &[TestCaseStatus] = &[TestCaseStatus::Draft, TestCaseStatus::Edited];
    match action {
        TestCaseAction::Approve => {
            check("test case", id, "approve", from, PENDING)?;
            Ok(TestCaseStatus::Approved)
        }
        TestCaseAction::Reject => {
            check("test case", id, "reject", from, PENDING)?;
            Ok(TestCaseStatus::Rejected)
        }
        TestCaseAction::Edit => Ok(if from.is_pending() {
            TestCaseStatus::Edited
        } else {
            TestCaseStatus::Draft
        }),
    }
}

// ── Script ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptAction {
    Approve,
    Reject,
}

pub fn script_transition(
    id: impl Display,
    from: ScriptStatus,
    action: ScriptAction,
) -> CoreResult<ScriptStatus> {
    match action {
        ScriptAction::Approve => {
            check("script", id, "approve", from, &[ScriptStatus::Draft])?;
            Ok(ScriptStatus::Approved)
        }
        ScriptAction::Reject => {
            check(
                "script",
                id,
                "reject",
                from,
                &[ScriptStatus::Draft, ScriptStatus::ValidationFailed],
            )?;
            Ok(ScriptStatus::Rejected)
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
