//! Dashboard metrics, recomputed from ledger state on every read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::execution::{Execution, ExecutionStatus, ResultStatus};
use crate::ids::{ProjectId, TestCaseId};
use crate::script::{AutomationScript, ScriptStatus};
use crate::test_case::{TestCase, TestCaseStatus};

/// Items waiting for a review decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingApprovals {
    pub scenarios: usize,
    pub test_cases: usize,
    pub scripts: usize,
}

impl PendingApprovals {
    pub fn total(&self) -> usize {
        self.scenarios + self.test_cases + self.scripts
    }
}

/// Aggregate health of one project or of every project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    /// `None` for the global dashboard
    pub project_id: Option<ProjectId>,
    /// Percentage of approved test cases with an approved script
    pub automation_rate: Option<f64>,
    /// Passed over passed + failed in each project's latest finished execution
    pub pass_rate: Option<f64>,
    pub pending_approvals: PendingApprovals,
    pub flaky_tests: Vec<TestCaseId>,
    pub token_usage: u64,
}

/// Derived per-project figures; never stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub project_id: ProjectId,
    pub requirements: usize,
    /// Covered scenarios over all scenarios of non-archived requirements
    pub coverage_percent: Option<f64>,
    pub pass_rate: Option<f64>,
    pub last_execution: Option<DateTime<Utc>>,
}

pub(crate) fn percent(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 * 100.0 / whole as f64)
}

/// Share of approved test cases (current version) that have at least one
/// approved script.
pub fn automation_rate(cases: &[&TestCase], scripts: &[&AutomationScript]) -> Option<f64> {
    let approved: Vec<&TestCaseId> = cases
        .iter()
        .filter(|c| c.status == TestCaseStatus::Approved)
        .map(|c| &c.id)
        .collect();
    let automated: BTreeSet<&TestCaseId> = scripts
        .iter()
        .filter(|s| s.status == ScriptStatus::Approved)
        .map(|s| &s.test_case_id)
        .collect();
    let covered = approved.iter().filter(|id| automated.contains(*id)).count();
    percent(covered, approved.len())
}

/// Latest finished, non-cancelled execution of a project
pub fn latest_finished<'a>(executions: &[&'a Execution]) -> Option<&'a Execution> {
    executions
        .iter()
        .copied()
        .filter(|e| e.is_finished() && e.status != ExecutionStatus::Cancelled)
        .max_by_key(|e| (e.end_time, e.start_time))
}

/// Pass rate over the latest finished execution of each project
pub fn pass_rate(executions: &[&Execution]) -> Option<f64> {
    let mut by_project: BTreeMap<&ProjectId, Vec<&Execution>> = BTreeMap::new();
    for exec in executions {
        by_project.entry(&exec.project_id).or_default().push(exec);
    }
    let (mut passed, mut failed) = (0, 0);
    for execs in by_project.values() {
        if let Some(latest) = latest_finished(execs) {
            let summary = latest.summary();
            passed += summary.passed;
            failed += summary.failed;
        }
    }
    percent(passed, passed + failed)
}

/// Test cases that, within the last `window` finished executions, passed
/// only after retries or both passed and failed.
pub fn flaky_tests(executions: &[&Execution], window: usize) -> Vec<TestCaseId> {
    let mut finished: Vec<&Execution> = executions
        .iter()
        .copied()
        .filter(|e| e.is_finished())
        .collect();
    finished.sort_by_key(|e| std::cmp::Reverse((e.end_time, e.start_time)));

    #[derive(Default)]
    struct Seen {
        passed: bool,
        failed: bool,
        retried_pass: bool,
    }

    let mut seen: BTreeMap<&TestCaseId, Seen> = BTreeMap::new();
    for exec in finished.into_iter().take(window) {
        for result in exec.results() {
            let entry = seen.entry(&result.test_case_id).or_default();
            match result.status {
                ResultStatus::Passed => {
                    entry.passed = true;
                    if result.retry_count > 0 {
                        entry.retried_pass = true;
                    }
                }
                ResultStatus::Failed => entry.failed = true,
                ResultStatus::Skipped => {}
            }
        }
    }
    seen.into_iter()
        .filter(|(_, s)| s.retried_pass || (s.passed && s.failed))
        .map(|(id, _)| id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{PlannedRun, ResultInput};
    use crate::ids::{ExecutionId, ResultId, ScriptId};
    use crate::version::Version;
    use chrono::Duration;

    fn finished_execution(
        id: &str,
        project: &str,
        offset_secs: i64,
        results: &[(&str, ResultStatus, u32)],
    ) -> Execution {
        let start = Utc::now() + Duration::seconds(offset_secs);
        let plan = results
            .iter()
            .map(|(tc, _, _)| PlannedRun {
                test_case_id: TestCaseId::new(*tc),
                script_id: ScriptId::new(format!("SCR-{tc}")),
                script_version: Version::INITIAL,
            })
            .collect();
        let mut exec = Execution::new(
            ExecutionId::new(id),
            ProjectId::new(project),
            plan,
            "ci".to_string(),
            start,
        )
        .unwrap();
        for (i, (tc, status, retries)) in results.iter().enumerate() {
            let mut input = ResultInput::new(TestCaseId::new(*tc), *status);
            input.retry_count = *retries;
            exec.record(ResultId::new(format!("RES-{id}-{i}")), input, start)
                .unwrap();
        }
        exec
    }

    #[test]
    fn test_pass_rate_uses_latest_per_project() {
        let old = finished_execution("EXE-001", "PROJ-001", 0, &[("TC-001", ResultStatus::Failed, 0)]);
        let new = finished_execution("EXE-002", "PROJ-001", 60, &[("TC-001", ResultStatus::Passed, 0)]);
        let other = finished_execution(
            "EXE-003",
            "PROJ-002",
            0,
            &[
                ("TC-002", ResultStatus::Passed, 0),
                ("TC-003", ResultStatus::Failed, 0),
                ("TC-004", ResultStatus::Skipped, 0),
            ],
        );
        assert_eq!(pass_rate(&[&old, &new]), Some(100.0));
        let global = pass_rate(&[&old, &new, &other]).unwrap();
        assert!((global - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(pass_rate(&[]), None);
    }

    #[test]
    fn test_flaky_detection() {
        let first = finished_execution(
            "EXE-001",
            "PROJ-001",
            0,
            &[
                ("TC-001", ResultStatus::Passed, 0),
                ("TC-002", ResultStatus::Passed, 0),
            ],
        );
        let second = finished_execution(
            "EXE-002",
            "PROJ-001",
            60,
            &[
                ("TC-001", ResultStatus::Failed, 0),
                ("TC-002", ResultStatus::Passed, 0),
                ("TC-003", ResultStatus::Passed, 2),
            ],
        );
        let flaky = flaky_tests(&[&first, &second], 5);
        assert_eq!(flaky, vec![TestCaseId::new("TC-001"), TestCaseId::new("TC-003")]);

        // Only the newest execution is inspected with a window of one
        let flaky = flaky_tests(&[&first, &second], 1);
        assert_eq!(flaky, vec![TestCaseId::new("TC-003")]);
    }

    #[test]
    fn test_pending_total() {
        let pending = PendingApprovals {
            scenarios: 1,
            test_cases: 2,
            scripts: 3,
        };
        assert_eq!(pending.total(), 6);
    }
}
