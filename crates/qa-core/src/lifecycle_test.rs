use super::*;
use crate::error::ErrorKind;

#[test]
fn test_analyze_only_leaves_draft() {
    let clean = RequirementAction::Analyze {
        needs_clarification: false,
    };
    let blocked = RequirementAction::Analyze {
        needs_clarification: true,
    };
    assert_eq!(
        requirement_transition("REQ-001", RequirementStatus::Draft, clean).unwrap(),
        RequirementStatus::Ready
    );
    assert_eq!(
        requirement_transition("REQ-001", RequirementStatus::Draft, blocked).unwrap(),
        RequirementStatus::ClarificationRequired
    );

    for from in RequirementStatus::ALL {
        if *from == RequirementStatus::Draft {
            continue;
        }
        assert!(requirement_transition("REQ-001", *from, clean).is_err());
    }
}

#[test]
fn test_nothing_but_revise_and_archive_moves_draft() {
    for action in [
        RequirementAction::ResolveClarification,
        RequirementAction::GenerateScenarios,
        RequirementAction::GenerateTestCases,
        RequirementAction::Approve,
    ] {
        let err = requirement_transition("REQ-001", RequirementStatus::Draft, action).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);
    }
}

#[test]
fn test_happy_path_chain() {
    let mut status = RequirementStatus::Draft;
    for action in [
        RequirementAction::Analyze {
            needs_clarification: true,
        },
        RequirementAction::ResolveClarification,
        RequirementAction::GenerateScenarios,
        RequirementAction::GenerateTestCases,
        RequirementAction::GenerateTestCases,
        RequirementAction::Approve,
    ] {
        status = requirement_transition("REQ-001", status, action).unwrap();
    }
    assert_eq!(status, RequirementStatus::Approved);
}

#[test]
fn test_precondition_message_names_required_states() {
    let err = requirement_transition(
        "REQ-002",
        RequirementStatus::Ready,
        RequirementAction::GenerateTestCases,
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("[P001]"));
    assert!(msg.contains("REQ-002"));
    assert!(msg.contains("status is ready"));
    assert!(msg.contains("scenarios-generated or test-cases-generated"));
}

#[test]
fn test_archived_is_terminal() {
    let status = requirement_transition(
        "REQ-001",
        RequirementStatus::Approved,
        RequirementAction::Archive,
    )
    .unwrap();
    assert_eq!(status, RequirementStatus::Archived);
    assert!(requirement_next_actions(RequirementStatus::Archived).is_empty());
    assert!(
        requirement_transition("REQ-001", status, RequirementAction::Revise).is_err()
    );
}

#[test]
fn test_revise_returns_to_draft() {
    assert_eq!(
        requirement_transition(
            "REQ-001",
            RequirementStatus::TestCasesGenerated,
            RequirementAction::Revise
        )
        .unwrap(),
        RequirementStatus::Draft
    );
}

#[test]
fn test_next_actions_from_ready() {
    let actions = requirement_next_actions(RequirementStatus::Ready);
    assert_eq!(actions, vec!["generate scenarios", "revise", "archive"]);
}

#[test]
fn test_test_case_review() {
    for from in [TestCaseStatus::Draft, TestCaseStatus::Edited] {
        assert_eq!(
            test_case_transition("TC-001", from, TestCaseAction::Approve).unwrap(),
            TestCaseStatus::Approved
        );
        assert_eq!(
            test_case_transition("TC-001", from, TestCaseAction::Reject).unwrap(),
            TestCaseStatus::Rejected
        );
    }
    let err = test_case_transition("TC-001", TestCaseStatus::Rejected, TestCaseAction::Approve)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);
}

#[test]
fn test_test_case_edit_supersedes_reviewed_version() {
    assert_eq!(
        test_case_transition("TC-001", TestCaseStatus::Draft, TestCaseAction::Edit).unwrap(),
        TestCaseStatus::Edited
    );
    assert_eq!(
        test_case_transition("TC-001", TestCaseStatus::Approved, TestCaseAction::Edit).unwrap(),
        TestCaseStatus::Draft
    );
    assert_eq!(
        test_case_transition("TC-001", TestCaseStatus::Rejected, TestCaseAction::Edit).unwrap(),
        TestCaseStatus::Draft
    );
}

#[test]
fn test_scenario_edit_only_in_draft() {
    assert!(scenario_transition("SCN-001", ScenarioStatus::Draft, ScenarioAction::Edit).is_ok());
    assert!(
        scenario_transition("SCN-001", ScenarioStatus::Approved, ScenarioAction::Edit).is_err()
    );
    assert!(
        scenario_transition("SCN-001", ScenarioStatus::Approved, ScenarioAction::Approve).is_err()
    );
}

#[test]
fn test_script_review() {
    assert_eq!(
        script_transition("SCR-001", ScriptStatus::Draft, ScriptAction::Approve).unwrap(),
        ScriptStatus::Approved
    );
    assert!(
        script_transition("SCR-001", ScriptStatus::ValidationFailed, ScriptAction::Approve)
            .is_err()
    );
    assert_eq!(
        script_transition("SCR-001", ScriptStatus::ValidationFailed, ScriptAction::Reject)
            .unwrap(),
        ScriptStatus::Rejected
    );
    assert!(script_transition("SCR-001", ScriptStatus::Approved, ScriptAction::Reject).is_err());
}
