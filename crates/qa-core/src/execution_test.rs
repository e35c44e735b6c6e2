use super::*;
use crate::error::ErrorKind;
use chrono::Duration;

fn plan(n: usize) -> Vec<PlannedRun> {
    (1..=n)
        .map(|i| PlannedRun {
            test_case_id: TestCaseId::new(format!("TC-{i:03}")),
            script_id: ScriptId::new(format!("SCR-{i:03}")),
            script_version: Version::INITIAL,
        })
        .collect()
}

fn execution(n: usize) -> Execution {
    Execution::new(
        ExecutionId::new("EXE-001"),
        ProjectId::new("PROJ-001"),
        plan(n),
        "ci".to_string(),
        Utc::now(),
    )
    .unwrap()
}

fn ids() -> impl FnMut() -> ResultId {
    let mut n = 100;
    move || {
        n += 1;
        ResultId::new(format!("RES-{n}"))
    }
}

fn input(case: &str, status: ResultStatus) -> ResultInput {
    ResultInput::new(TestCaseId::new(case), status)
}

fn assert_counts_consistent(exec: &Execution) {
    let s = exec.summary();
    assert_eq!(s.total, s.passed + s.failed + s.skipped);
    assert_eq!(s.total, exec.results().len());
}

#[test]
fn test_empty_plan_rejected() {
    let err = Execution::new(
        ExecutionId::new("EXE-001"),
        ProjectId::new("PROJ-001"),
        vec![],
        "ci".to_string(),
        Utc::now(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_results_out_of_order_complete_execution() {
    let mut exec = execution(3);
    let mut next = ids();
    let now = Utc::now();

    assert!(!exec.record(next(), input("TC-003", ResultStatus::Passed), now).unwrap());
    assert_counts_consistent(&exec);
    assert!(!exec.record(next(), input("TC-001", ResultStatus::Passed), now).unwrap());
    assert_counts_consistent(&exec);
    assert_eq!(exec.status, ExecutionStatus::Running);
    assert!(exec.end_time.is_none());

    assert!(exec.record(next(), input("TC-002", ResultStatus::Passed), now).unwrap());
    assert_counts_consistent(&exec);
    assert_eq!(exec.status, ExecutionStatus::Passed);
    assert!(exec.end_time.is_some());
    assert!(exec.duration_ms.is_some());
}

#[test]
fn test_failed_result_classifies_failed() {
    let mut exec = execution(2);
    let mut next = ids();
    let now = Utc::now();
    let mut failed = input("TC-001", ResultStatus::Failed);
    failed.failure_category = Some(FailureCategory::Locator);
    exec.record(next(), failed, now).unwrap();
    exec.record(next(), input("TC-002", ResultStatus::Passed), now)
        .unwrap();
    assert_eq!(exec.status, ExecutionStatus::Failed);
    assert_eq!(exec.summary().failed, 1);
}

#[test]
fn test_partial_when_skipped_and_passed() {
    let mut exec = execution(2);
    let mut next = ids();
    let now = Utc::now();
    exec.record(next(), input("TC-001", ResultStatus::Passed), now)
        .unwrap();
    exec.record(next(), input("TC-002", ResultStatus::Skipped), now)
        .unwrap();
    assert_eq!(exec.status, ExecutionStatus::Partial);
}

#[test]
fn test_classify_all_skipped_is_failed() {
    let summary = ExecutionSummary {
        total: 2,
        skipped: 2,
        ..Default::default()
    };
    assert_eq!(classify(&summary), ExecutionStatus::Failed);
}

#[test]
fn test_failure_category_only_on_failed() {
    let mut exec = execution(1);
    let mut passed = input("TC-001", ResultStatus::Passed);
    passed.failure_category = Some(FailureCategory::Timeout);
    let err = exec.record(ids()(), passed, Utc::now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(exec.results().is_empty());
}

#[test]
fn test_result_must_be_planned() {
    let mut exec = execution(1);
    let err = exec
        .record(ids()(), input("TC-999", ResultStatus::Passed), Utc::now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_duplicate_result_conflicts() {
    let mut exec = execution(2);
    let mut next = ids();
    let now = Utc::now();
    exec.record(next(), input("TC-001", ResultStatus::Passed), now)
        .unwrap();
    let err = exec
        .record(next(), input("TC-001", ResultStatus::Failed), now)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(exec.summary().total, 1);
}

#[test]
fn test_cancel_skips_in_flight_and_sets_end_time() {
    let mut exec = execution(3);
    let mut next = ids();
    let now = Utc::now();
    exec.record(next(), input("TC-002", ResultStatus::Passed), now)
        .unwrap();

    let later = now + Duration::seconds(5);
    exec.cancel(later, &mut next).unwrap();

    assert_eq!(exec.status, ExecutionStatus::Cancelled);
    assert_eq!(exec.end_time, Some(later));
    let s = exec.summary();
    assert_eq!(s.passed, 1);
    assert_eq!(s.skipped, 2);
    assert_counts_consistent(&exec);
}

#[test]
fn test_record_after_completion_is_precondition_error() {
    let mut exec = execution(2);
    let mut next = ids();
    exec.cancel(Utc::now(), &mut next).unwrap();
    let err = exec
        .record(next(), input("TC-001", ResultStatus::Passed), Utc::now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionNotMet);
    assert!(exec.cancel(Utc::now(), &mut next).is_err());
}

#[test]
fn test_finish_early_records_skips() {
    let mut exec = execution(2);
    let mut next = ids();
    exec.record(next(), input("TC-001", ResultStatus::Passed), Utc::now())
        .unwrap();
    exec.finish(Utc::now(), &mut next).unwrap();
    assert_eq!(exec.status, ExecutionStatus::Partial);
    assert_eq!(exec.summary().skipped, 1);
}

#[test]
fn test_pass_rate_excludes_skipped() {
    let summary = ExecutionSummary {
        total: 4,
        passed: 3,
        failed: 1,
        skipped: 0,
        duration_ms: 0,
    };
    assert_eq!(summary.pass_rate(), Some(75.0));
    assert_eq!(ExecutionSummary::default().pass_rate(), None);
}

#[test]
fn test_serde_roundtrip_keeps_results() {
    let mut exec = execution(2);
    exec.record(ids()(), input("TC-001", ResultStatus::Passed), Utc::now())
        .unwrap();
    let json = serde_json::to_string(&exec).unwrap();
    let back: Execution = serde_json::from_str(&json).unwrap();
    assert_eq!(back.summary(), exec.summary());
    assert_eq!(back.pending_runs().len(), 1);
}
