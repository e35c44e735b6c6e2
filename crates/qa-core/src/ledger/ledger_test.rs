use super::*;
use crate::error::ErrorKind;
use crate::execution::{ExecutionStatus, ResultInput, ResultStatus};
use crate::project::{GenerationSettings, NewProject};
use crate::receipt::{Operation, ReceiptCheck, ReceiptState, RequestKey};
use crate::requirement::{
    AnalysisOutcome, CoverageStatus, DetectedIssue, IssueKind, IssueSeverity, NewRequirement,
    RequirementRevision, RequirementStatus,
};
use crate::scenario::{ScenarioDraft, ScenarioType};
use crate::script::{Framework, Language, ScriptDraft, ScriptStatus, ValidationResult};
use crate::test_case::{Priority, StepDraft, TestCaseDraft, TestCaseStatus, TestType};

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn setup() -> (Ledger, ProjectId, RequirementId) {
    let mut ledger = Ledger::new();
    ledger.set_actor("qa-lead@company.com");
    let project = ledger
        .create_project(
            NewProject {
                name: "E-Commerce Platform".to_string(),
                owner: "john.doe@company.com".to_string(),
                release: "R2.1".to_string(),
                ..Default::default()
            },
            &GenerationSettings::default(),
            now(),
        )
        .unwrap();
    let requirement = ledger
        .ingest_requirement(
            &project,
            NewRequirement {
                title: "User Checkout Process".to_string(),
                description: "Users must be able to complete checkout with a credit card"
                    .to_string(),
                acceptance_criteria: vec!["Order confirmation is shown".to_string()],
                ..Default::default()
            },
            now(),
        )
        .unwrap();
    (ledger, project, requirement)
}

fn make_ready(ledger: &mut Ledger, id: &RequirementId) {
    let status = ledger
        .record_analysis(id, None, AnalysisOutcome::default(), now())
        .unwrap();
    assert_eq!(status, RequirementStatus::Ready);
}

fn scenario(title: &str, scenario_type: ScenarioType) -> ScenarioDraft {
    ScenarioDraft {
        title: title.to_string(),
        scenario_type,
        description: format!("{title} scenario"),
        preconditions: vec!["User is logged in".to_string()],
        expected_outcome: "Outcome is observed".to_string(),
    }
}

fn checkout_scenarios() -> Vec<ScenarioDraft> {
    vec![
        scenario("Successful checkout with credit card", ScenarioType::Happy),
        scenario("Checkout with insufficient inventory", ScenarioType::Negative),
        scenario("Checkout with expired card", ScenarioType::Validation),
        scenario("Unauthorized access to checkout", ScenarioType::Authorization),
    ]
}

fn case(title: &str) -> TestCaseDraft {
    TestCaseDraft {
        title: title.to_string(),
        priority: Priority::High,
        test_type: TestType::Ui,
        preconditions: vec![],
        steps: vec![
            StepDraft::new("Navigate to shopping cart"),
            StepDraft::new("Click checkout"),
        ],
        expected_results: vec!["Order is created".to_string()],
        postconditions: vec![],
        tags: vec![],
    }
}

/// Ready requirement with four scenarios and one draft case per scenario
fn with_cases() -> (Ledger, ProjectId, RequirementId, Vec<TestCaseId>) {
    let (mut ledger, project, req) = setup();
    make_ready(&mut ledger, &req);
    let scenarios = ledger
        .add_generated_scenarios(&req, checkout_scenarios(), now())
        .unwrap();
    let batch = scenarios
        .iter()
        .map(|s| (s.clone(), vec![case(&format!("Case for {s}"))]))
        .collect();
    let cases = ledger.add_generated_test_cases(&req, batch, now()).unwrap();
    (ledger, project, req, cases)
}

fn script_draft(failed: bool) -> ScriptDraft {
    let mut results = vec![ValidationResult::passed("test-block", "ok")];
    if failed {
        results.push(ValidationResult::failed("assertions", "no assertions found"));
    }
    ScriptDraft {
        framework: Framework::Playwright,
        language: Language::TypeScript,
        code: "test('checkout', async ({ page }) => { await expect(page).toHaveURL('/'); });"
            .to_string(),
        validation_results: results,
    }
}

#[test]
fn test_requirement_four_scenarios_and_coverage_progression() {
    let (mut ledger, _, req) = setup();
    make_ready(&mut ledger, &req);

    let scenarios = ledger
        .add_generated_scenarios(&req, checkout_scenarios(), now())
        .unwrap();
    assert_eq!(scenarios.len(), 4);
    assert_eq!(
        ledger.requirement(&req).unwrap().status,
        RequirementStatus::ScenariosGenerated
    );
    assert_eq!(ledger.scenarios_for(&req).count(), 4);
    assert_eq!(
        ledger.requirement(&req).unwrap().coverage_status,
        CoverageStatus::NotGenerated
    );

    let batch = scenarios
        .iter()
        .map(|s| (s.clone(), vec![case(&format!("Case for {s}"))]))
        .collect();
    let cases = ledger.add_generated_test_cases(&req, batch, now()).unwrap();
    assert_eq!(cases.len(), 4);
    assert_eq!(
        ledger.requirement(&req).unwrap().status,
        RequirementStatus::TestCasesGenerated
    );

    let expected = [
        (0, CoverageStatus::NotGenerated),
        (2, CoverageStatus::Partial),
        (4, CoverageStatus::Complete),
    ];
    let mut approved = 0;
    for (target, coverage) in expected {
        while approved < target {
            ledger.approve_test_case(&cases[approved], None, now()).unwrap();
            approved += 1;
        }
        let requirement = ledger.requirement(&req).unwrap();
        assert_eq!(requirement.coverage_status, coverage);
        assert_eq!(requirement.linked_test_cases, 4);
        assert!(ledger.check_integrity().is_empty());
    }

    ledger.approve_requirement(&req, None, now()).unwrap();
    assert_eq!(
        ledger.requirement(&req).unwrap().status,
        RequirementStatus::Approved
    );
}

#[test]
fn test_approve_requirement_requires_complete_coverage() {
    let (mut ledger, _, req, cases) = with_cases();
    ledger.approve_test_case(&cases[0], None, now()).unwrap();
    let err = ledger.approve_requirement(&req, None, now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);
    assert!(err.to_string().contains("coverage partial"));
}

#[test]
fn test_approving_case_of_draft_requirement_fails() {
    let (mut ledger, _, req, cases) = with_cases();
    ledger
        .revise_requirement(
            &req,
            None,
            RequirementRevision {
                description: Some("Checkout now supports gift cards".to_string()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
    assert_eq!(
        ledger.requirement(&req).unwrap().status,
        RequirementStatus::Draft
    );

    let err = ledger.approve_test_case(&cases[0], None, now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);
    assert_eq!(
        ledger.test_case(&cases[0]).unwrap().status,
        TestCaseStatus::Draft
    );
}

#[test]
fn test_generation_requires_ready_requirement() {
    let (mut ledger, _, req) = setup();
    let err = ledger
        .add_generated_scenarios(&req, checkout_scenarios(), now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);
    assert_eq!(ledger.scenarios_for(&req).count(), 0);
    assert_eq!(ledger.sequences.scenario, 0);
}

#[test]
fn test_error_issue_requires_clarification() {
    let (mut ledger, _, req) = setup();
    let outcome = AnalysisOutcome {
        issues: vec![DetectedIssue {
            kind: IssueKind::AmbiguousLanguage,
            severity: IssueSeverity::Error,
            description: "The term \"checkout process\" is not clearly defined".to_string(),
            suggestion: "Specify which steps are included".to_string(),
        }],
        ..Default::default()
    };
    let status = ledger.record_analysis(&req, None, outcome, now()).unwrap();
    assert_eq!(status, RequirementStatus::ClarificationRequired);
    assert_eq!(ledger.requirement(&req).unwrap().issues.len(), 1);

    assert!(ledger.clarify_requirement(&req, None, "  ", now()).is_err());
    let status = ledger
        .clarify_requirement(&req, None, "Checkout includes payment and confirmation", now())
        .unwrap();
    assert_eq!(status, RequirementStatus::Ready);
    assert!(ledger
        .requirement(&req)
        .unwrap()
        .full_text()
        .contains("Clarification: Checkout includes payment"));
}

#[test]
fn test_revise_pushes_version_and_keeps_history() {
    let (mut ledger, _, req) = setup();
    make_ready(&mut ledger, &req);

    let noop = RequirementRevision {
        title: Some("User Checkout Process".to_string()),
        ..Default::default()
    };
    let err = ledger.revise_requirement(&req, None, noop, now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let version = ledger
        .revise_requirement(
            &req,
            Some(Version::INITIAL),
            RequirementRevision {
                title: Some("Guest Checkout Process".to_string()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
    assert_eq!(version.to_string(), "v2");

    let history = ledger.requirement_history(&req).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.is_monotonic());
    let v1 = history.get(Version::INITIAL).unwrap();
    assert_eq!(v1.title, "User Checkout Process");
    assert_eq!(v1.status, RequirementStatus::Ready);
    let current = history.current();
    assert_eq!(current.status, RequirementStatus::Draft);
    assert!(current.analysis.is_none());
}

#[test]
fn test_revision_drops_earlier_scenarios_from_coverage() {
    let (mut ledger, _, req, cases) = with_cases();
    let old_scenarios: Vec<ScenarioId> = ledger.scenarios_for(&req).map(|s| s.id.clone()).collect();
    for tc in &cases {
        ledger.approve_test_case(tc, None, now()).unwrap();
    }
    assert_eq!(ledger.requirement(&req).unwrap().coverage_status, CoverageStatus::Complete);

    ledger
        .revise_requirement(
            &req,
            None,
            RequirementRevision {
                title: Some("Guest Checkout Process".to_string()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
    let revised = ledger.requirement(&req).unwrap();
    assert_eq!(revised.status, RequirementStatus::Draft);
    assert_eq!(revised.coverage_status, CoverageStatus::NotGenerated);
    assert_eq!(revised.linked_test_cases, 0);
    assert_eq!(ledger.current_scenarios_for(&req).count(), 0);
    assert_eq!(ledger.scenarios_for(&req).count(), 4);
    assert!(ledger.check_integrity().is_empty());

    make_ready(&mut ledger, &req);
    let fresh = ledger
        .add_generated_scenarios(
            &req,
            vec![scenario("Guest checkout with credit card", ScenarioType::Happy)],
            now(),
        )
        .unwrap();
    let err = ledger
        .add_generated_test_cases(&req, vec![(old_scenarios[0].clone(), vec![case("Old")])], now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let new_cases = ledger
        .add_generated_test_cases(&req, vec![(fresh[0].clone(), vec![case("Guest pays")])], now())
        .unwrap();
    ledger.approve_test_case(&new_cases[0], None, now()).unwrap();
    // only the one current scenario needs an approved case
    ledger.approve_requirement(&req, None, now()).unwrap();
    assert_eq!(ledger.requirement(&req).unwrap().status, RequirementStatus::Approved);
}

#[test]
fn test_stale_expected_version_conflicts() {
    let (mut ledger, _, req) = setup();
    let err = ledger
        .record_analysis(
            &req,
            Version::new(2),
            AnalysisOutcome::default(),
            now(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        ledger.requirement(&req).unwrap().status,
        RequirementStatus::Draft
    );
}

#[test]
fn test_test_case_history_is_monotonic_and_retrievable() {
    let (mut ledger, _, req, cases) = with_cases();
    let tc = &cases[0];

    let mut edited = case("Successful checkout with saved card");
    let v2 = ledger.edit_test_case(tc, Some(Version::INITIAL), edited.clone(), now()).unwrap();
    assert_eq!(ledger.test_case(tc).unwrap().status, TestCaseStatus::Edited);

    let err = ledger.edit_test_case(tc, Some(v2), edited.clone(), now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    ledger.approve_test_case(tc, Some(v2), now()).unwrap();
    edited.steps.push(StepDraft::new("Confirm order"));
    let v3 = ledger.edit_test_case(tc, Some(v2), edited, now()).unwrap();
    assert_eq!(v3.number(), 3);

    let history = ledger.test_case_history(tc).unwrap();
    assert!(history.is_monotonic());
    assert_eq!(history.get(Version::INITIAL).unwrap().title, "Case for SCN-001");
    assert_eq!(history.get(v2).unwrap().status, TestCaseStatus::Approved);
    assert_eq!(history.current().status, TestCaseStatus::Draft);
    assert_eq!(history.current().steps.len(), 3);
    assert_eq!(
        ledger.requirement(&req).unwrap().coverage_status,
        CoverageStatus::NotGenerated
    );
    assert!(ledger.check_integrity().is_empty());
}

#[test]
fn test_generating_cases_twice_for_a_scenario_conflicts() {
    let (mut ledger, _, req, _) = with_cases();
    let first = ledger.scenarios_for(&req).next().unwrap().id.clone();
    let err = ledger
        .add_generated_test_cases(&req, vec![(first, vec![case("again")])], now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(ledger.test_cases(Some(&req)).count(), 4);
}

#[test]
fn test_manual_scenario_fills_gap_on_regeneration() {
    let (mut ledger, _, req, cases) = with_cases();
    for tc in &cases {
        ledger.approve_test_case(tc, None, now()).unwrap();
    }
    let manual = ledger
        .add_manual_scenario(&req, scenario("Checkout with coupon", ScenarioType::Edge), now())
        .unwrap();
    assert_eq!(
        ledger.requirement(&req).unwrap().coverage_status,
        CoverageStatus::Partial
    );

    let ids = ledger
        .add_generated_test_cases(&req, vec![(manual.clone(), vec![case("Coupon case")])], now())
        .unwrap();
    ledger.approve_test_case(&ids[0], None, now()).unwrap();
    assert_eq!(
        ledger.requirement(&req).unwrap().coverage_status,
        CoverageStatus::Complete
    );
    assert_eq!(ledger.scenario(&manual).unwrap().origin, crate::scenario::Origin::Manual);
}

#[test]
fn test_script_lifecycle() {
    let (mut ledger, _, _, cases) = with_cases();
    let tc = &cases[0];

    let err = ledger.add_script(tc, script_draft(false), now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);

    ledger.approve_test_case(tc, None, now()).unwrap();
    let script = ledger.add_script(tc, script_draft(true), now()).unwrap();
    assert_eq!(
        ledger.script(&script).unwrap().status,
        ScriptStatus::ValidationFailed
    );
    let err = ledger.approve_script(&script, None, now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);

    // regenerating for the same framework supersedes instead of duplicating
    let again = ledger.add_script(tc, script_draft(false), now()).unwrap();
    assert_eq!(again, script);
    assert_eq!(ledger.script_history(&script).unwrap().len(), 2);

    let mut with_warning = script_draft(false);
    with_warning
        .validation_results
        .push(ValidationResult::warning("hard-waits", "uses waitForTimeout"));
    ledger
        .revise_script(&script, Version::new(2), with_warning, now())
        .unwrap();
    let warnings = ledger.approve_script(&script, None, now()).unwrap();
    assert_eq!(warnings.len(), 1);
    let current = ledger.script(&script).unwrap();
    assert_eq!(current.status, ScriptStatus::Approved);
    assert!(current.approved_at.is_some());
    assert!(ledger
        .script_history(&script)
        .unwrap()
        .versions()
        .iter()
        .filter(|s| s.version.number() < 3)
        .all(|s| s.approved_at.is_none()));
}

#[test]
fn test_execution_through_ledger() {
    let (mut ledger, project, _, cases) = with_cases();
    let err = ledger
        .start_execution(&project, None, "ci", now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);

    for tc in &cases[..2] {
        ledger.approve_test_case(tc, None, now()).unwrap();
        let script = ledger.add_script(tc, script_draft(false), now()).unwrap();
        ledger.approve_script(&script, None, now()).unwrap();
    }

    let exec = ledger.start_execution(&project, None, "ci", now()).unwrap();
    assert_eq!(ledger.execution(&exec).unwrap().plan.len(), 2);

    ledger
        .record_result(&exec, ResultInput::new(cases[1].clone(), ResultStatus::Passed), now())
        .unwrap();
    let summary = ledger.execution(&exec).unwrap().summary();
    assert_eq!(summary.total, summary.passed + summary.failed + summary.skipped);

    let err = ledger
        .record_result(&exec, ResultInput::new(cases[3].clone(), ResultStatus::Passed), now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(ledger.sequences.result, 1);

    ledger
        .record_result(&exec, ResultInput::new(cases[0].clone(), ResultStatus::Failed), now())
        .unwrap();
    let execution = ledger.execution(&exec).unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.end_time.is_some());

    let metrics = ledger.dashboard(Some(&project), 5);
    assert_eq!(metrics.automation_rate, Some(100.0));
    assert_eq!(metrics.pass_rate, Some(50.0));
    assert_eq!(metrics.pending_approvals.test_cases, 2);
    assert_eq!(metrics.pending_approvals.scenarios, 4);

    let summary = ledger.project_summary(&project).unwrap();
    assert_eq!(summary.coverage_percent, Some(50.0));
    assert!(summary.last_execution.is_some());
    assert!(ledger.check_integrity().is_empty());
}

#[test]
fn test_archived_requirement_drops_out_of_pending_approvals() {
    let (mut ledger, project, req, cases) = with_cases();
    ledger.approve_test_case(&cases[0], None, now()).unwrap();
    ledger.add_script(&cases[0], script_draft(false), now()).unwrap();

    let before = ledger.dashboard(Some(&project), 5).pending_approvals;
    assert_eq!(before.scenarios, 4);
    assert_eq!(before.test_cases, 3);
    assert_eq!(before.scripts, 1);

    ledger.archive_requirement(&req, now()).unwrap();
    for pending in [
        ledger.dashboard(Some(&project), 5).pending_approvals,
        ledger.dashboard(None, 5).pending_approvals,
    ] {
        assert_eq!(pending.total(), 0);
    }
}

#[test]
fn test_cancel_execution_records_skips() {
    let (mut ledger, project, _, cases) = with_cases();
    ledger.approve_test_case(&cases[0], None, now()).unwrap();
    let script = ledger.add_script(&cases[0], script_draft(false), now()).unwrap();
    ledger.approve_script(&script, None, now()).unwrap();

    let exec = ledger
        .start_execution(&project, Some(&[script]), "nightly", now())
        .unwrap();
    ledger.cancel_execution(&exec, now()).unwrap();
    let execution = ledger.execution(&exec).unwrap();
    assert_eq!(execution.status, ExecutionStatus::Cancelled);
    assert_eq!(execution.summary().skipped, 1);
    assert!(ledger.finish_execution(&exec, now()).is_err());
}

#[test]
fn test_receipts_replay_and_conflict() {
    let (mut ledger, project, req) = setup();
    let key = |params: &str| {
        RequestKey::new(
            RequestToken::new("tok-42"),
            Operation::GenerateScenarios,
            project.clone(),
            req.as_str(),
            params,
        )
    };

    assert_eq!(ledger.begin_request(&key("a"), now()).unwrap(), ReceiptCheck::Proceed);
    ledger
        .fail_request(&key("a").token, "backend timeout", 10, now())
        .unwrap();
    assert_eq!(ledger.begin_request(&key("a"), now()).unwrap(), ReceiptCheck::Proceed);
    // the failed attempt's tokens survive the retry
    assert_eq!(ledger.receipt(&key("a").token).unwrap().tokens_used, 10);
    ledger
        .complete_request(&key("a").token, vec!["SCN-001".to_string()], 120, now())
        .unwrap();

    match ledger.begin_request(&key("a"), now()).unwrap() {
        ReceiptCheck::Replay(receipt) => {
            assert_eq!(receipt.state, ReceiptState::Completed);
            assert_eq!(receipt.produced, vec!["SCN-001".to_string()]);
            assert_eq!(receipt.tokens_used, 130);
        }
        other => panic!("expected replay, got {other:?}"),
    }

    let err = ledger.begin_request(&key("b"), now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(ledger.token_usage(Some(&project)), 130);
}

#[test]
fn test_archived_project_blocks_ingest() {
    let (mut ledger, project, _) = setup();
    ledger.archive_project(&project, now()).unwrap();
    let err = ledger
        .ingest_requirement(
            &project,
            NewRequirement {
                title: "Login".to_string(),
                description: "Users log in".to_string(),
                ..Default::default()
            },
            now(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);
    assert!(ledger.archive_project(&project, now()).is_err());
}

#[test]
fn test_ingest_defaults_release_and_owner_from_project() {
    let (ledger, _, req) = setup();
    let requirement = ledger.requirement(&req).unwrap();
    assert_eq!(requirement.release, "R2.1");
    assert_eq!(requirement.owner, "john.doe@company.com");
    assert_eq!(requirement.version, Version::INITIAL);
}

#[test]
fn test_audit_records_actor_and_transitions() {
    let (mut ledger, _, req) = setup();
    make_ready(&mut ledger, &req);
    let events: Vec<&AuditEvent> = ledger.audit_for(req.as_str()).collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].action, "ingest");
    assert_eq!(events[1].transition(), "draft -> ready");
    assert!(events.iter().all(|e| e.actor == "qa-lead@company.com"));
    assert!(ledger
        .audit_log()
        .windows(2)
        .all(|w| w[0].seq < w[1].seq));
}

#[test]
fn test_restore_roundtrip() {
    let (mut ledger, _, req, cases) = with_cases();
    ledger
        .edit_test_case(&cases[0], None, case("Edited once"), now())
        .unwrap();
    ledger.mark_saved(7);

    let restored = Ledger::restore(ledger.to_parts()).unwrap();
    assert_eq!(restored.revision(), 7);
    assert!(!restored.is_dirty());
    assert_eq!(restored.test_case_history(&cases[0]).unwrap().len(), 2);
    assert_eq!(
        restored.requirement(&req).unwrap().status,
        RequirementStatus::TestCasesGenerated
    );
    assert_eq!(restored.audit_log().len(), ledger.audit_log().len());
    assert!(restored.check_integrity().is_empty());
}

#[test]
fn test_integrity_reports_coverage_drift() {
    let (mut ledger, _, req, _) = with_cases();
    if let Some(history) = ledger.requirements.get_mut(&req) {
        history.current_mut().coverage_status = CoverageStatus::Complete;
    }
    let issues = ledger.check_integrity();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("cached coverage complete"));
}

#[test]
fn test_trace_graph_is_acyclic_and_reaches_cases() {
    let (ledger, project, req, cases) = with_cases();
    let graph = ledger.trace_graph();
    assert!(graph.validate().is_ok());
    let tree = graph.tree(&crate::trace::TraceNode::new(EntityKind::Project, project.as_str()));
    assert!(tree.iter().any(|(_, n)| n.id == req.as_str()));
    assert!(tree
        .iter()
        .any(|(depth, n)| *depth == 3 && n.id == cases[0].as_str()));
}
