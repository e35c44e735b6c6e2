//! Execution batches and result aggregation
//!
//! An [`Execution`] owns its results. Summary counts are never stored: they
//! are recomputed from the results on every read, so
//! `total = passed + failed + skipped` cannot drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{ExecutionId, ProjectId, ResultId, ScriptId, TestCaseId};
use crate::lifecycle::precondition;
use crate::status_enum::define_status_enum;
use crate::version::Version;

define_status_enum! {
    /// Status of an execution batch
    pub enum ExecutionStatus {
        Running => "running",
        Passed => "passed",
        Failed => "failed",
        /// Only reachable through explicit cancellation
        Cancelled => "cancelled",
        Partial => "partial",
    }
}

define_status_enum! {
    pub enum ResultStatus {
        Passed => "passed",
        Failed => "failed",
        Skipped => "skipped",
    }
}

define_status_enum! {
    /// Why a test failed
    pub enum FailureCategory {
        Assertion => "assertion",
        Locator => "locator",
        Authentication => "authentication",
        Environment => "environment",
        Timeout => "timeout",
    }
}

/// A script scheduled to run as part of an execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedRun {
    pub test_case_id: TestCaseId,
    pub script_id: ScriptId,
    /// Script version pinned when the execution started
    pub script_version: Version,
}

/// Outcome of running one test case within an execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: ResultId,
    pub execution_id: ExecutionId,
    pub test_case_id: TestCaseId,
    pub script_id: ScriptId,
    /// Script version actually run
    pub script_version: Version,
    pub status: ResultStatus,
    pub duration_ms: u64,
    pub retry_count: u32,
    /// Present only when `status` is failed
    #[serde(default)]
    pub failure_category: Option<FailureCategory>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A result reported by a test runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultInput {
    pub test_case_id: TestCaseId,
    pub status: ResultStatus,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub failure_category: Option<FailureCategory>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
}

impl ResultInput {
    pub fn new(test_case_id: TestCaseId, status: ResultStatus) -> Self {
        Self {
            test_case_id,
            status,
            duration_ms: 0,
            retry_count: 0,
            failure_category: None,
            logs: Vec::new(),
            screenshots: Vec::new(),
            stack_trace: None,
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if self.failure_category.is_some() && self.status != ResultStatus::Failed {
            return Err(CoreError::validation(
                "execution result",
                format!(
                    "failure category is only allowed on failed results, got {}",
                    self.status
                ),
            ));
        }
        Ok(())
    }
}

/// Counts recomputed from an execution's results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl ExecutionSummary {
    pub fn from_results(results: &[ExecutionResult]) -> Self {
        let mut summary = ExecutionSummary::default();
        for r in results {
            match r.status {
                ResultStatus::Passed => summary.passed += 1,
                ResultStatus::Failed => summary.failed += 1,
                ResultStatus::Skipped => summary.skipped += 1,
            }
            summary.duration_ms += r.duration_ms;
        }
        summary.total = summary.passed + summary.failed + summary.skipped;
        summary
    }

    /// Passed over passed + failed, as a percentage; skipped runs are excluded
    pub fn pass_rate(&self) -> Option<f64> {
        let decided = self.passed + self.failed;
        (decided > 0).then(|| self.passed as f64 * 100.0 / decided as f64)
    }
}

/// Classify a completed (not cancelled) execution from its counts.
///
/// An execution where every run was skipped produced no passing evidence and
/// is classified as failed.
pub fn classify(summary: &ExecutionSummary) -> ExecutionStatus {
    if summary.failed > 0 {
        ExecutionStatus::Failed
    } else if summary.skipped == 0 {
        ExecutionStatus::Passed
    } else if summary.passed > 0 {
        ExecutionStatus::Partial
    } else {
        ExecutionStatus::Failed
    }
}

/// One run of a batch of automation scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub project_id: ProjectId,
    pub status: ExecutionStatus,
    pub plan: Vec<PlannedRun>,
    results: Vec<ExecutionResult>,
    pub start_time: DateTime<Utc>,
    /// Set only on completion or cancellation
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    pub triggered_by: String,
}

impl Execution {
    pub fn new(
        id: ExecutionId,
        project_id: ProjectId,
        plan: Vec<PlannedRun>,
        triggered_by: String,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if plan.is_empty() {
            return Err(CoreError::validation(
                "execution",
                "an execution needs at least one approved script to run",
            ));
        }
        Ok(Self {
            id,
            project_id,
            status: ExecutionStatus::Running,
            plan,
            results: Vec::new(),
            start_time: now,
            end_time: None,
            duration_ms: None,
            triggered_by,
        })
    }

    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary::from_results(&self.results)
    }

    pub fn is_finished(&self) -> bool {
        self.status != ExecutionStatus::Running
    }

    pub fn result_for(&self, test_case_id: &TestCaseId) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| &r.test_case_id == test_case_id)
    }

    /// Planned runs that have not reported a result yet
    pub fn pending_runs(&self) -> Vec<&PlannedRun> {
        self.plan
            .iter()
            .filter(|p| self.result_for(&p.test_case_id).is_none())
            .collect()
    }

    fn ensure_running(&self, action: &str) -> CoreResult<()> {
        if self.is_finished() {
            return Err(precondition(
                "execution",
                &self.id,
                action,
                self.status,
                &[ExecutionStatus::Running],
            ));
        }
        Ok(())
    }

    /// Append a result. Results may arrive in any order; the execution
    /// completes once every planned run has reported.
    ///
    /// Returns `true` when this result completed the execution.
    pub fn record(
        &mut self,
        id: ResultId,
        input: ResultInput,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        self.ensure_running("record a result for")?;
        input.validate()?;

        let planned = self
            .plan
            .iter()
            .find(|p| p.test_case_id == input.test_case_id)
            .ok_or_else(|| {
                CoreError::validation(
                    "execution result",
                    format!(
                        "test case '{}' is not part of execution '{}'",
                        input.test_case_id, self.id
                    ),
                )
            })?
            .clone();

        if self.result_for(&input.test_case_id).is_some() {
            return Err(CoreError::conflict(
                "execution",
                &self.id,
                format!("a result for '{}' was already recorded", input.test_case_id),
            ));
        }

        self.results.push(ExecutionResult {
            id,
            execution_id: self.id.clone(),
            test_case_id: planned.test_case_id,
            script_id: planned.script_id,
            script_version: planned.script_version,
            status: input.status,
            duration_ms: input.duration_ms,
            retry_count: input.retry_count,
            failure_category: input.failure_category,
            logs: input.logs,
            screenshots: input.screenshots,
            stack_trace: input.stack_trace,
            recorded_at: now,
        });

        if self.pending_runs().is_empty() {
            self.complete(None, now);
            return Ok(true);
        }
        Ok(false)
    }

    /// Complete early, recording every outstanding run as skipped.
    pub fn finish(
        &mut self,
        now: DateTime<Utc>,
        mut next_id: impl FnMut() -> ResultId,
    ) -> CoreResult<()> {
        self.ensure_running("finish")?;
        self.skip_pending("not run before the execution was finished", now, &mut next_id);
        self.complete(None, now);
        Ok(())
    }

    /// Cancel immediately; in-flight runs are recorded as skipped.
    pub fn cancel(
        &mut self,
        now: DateTime<Utc>,
        mut next_id: impl FnMut() -> ResultId,
    ) -> CoreResult<()> {
        self.ensure_running("cancel")?;
        self.skip_pending("cancelled while in flight", now, &mut next_id);
        self.complete(Some(ExecutionStatus::Cancelled), now);
        Ok(())
    }

    fn skip_pending(
        &mut self,
        reason: &str,
        now: DateTime<Utc>,
        next_id: &mut impl FnMut() -> ResultId,
    ) {
        let pending: Vec<PlannedRun> = self.pending_runs().into_iter().cloned().collect();
        for run in pending {
            self.results.push(ExecutionResult {
                id: next_id(),
                execution_id: self.id.clone(),
                test_case_id: run.test_case_id,
                script_id: run.script_id,
                script_version: run.script_version,
                status: ResultStatus::Skipped,
                duration_ms: 0,
                retry_count: 0,
                failure_category: None,
                logs: vec![reason.to_string()],
                screenshots: Vec::new(),
                stack_trace: None,
                recorded_at: now,
            });
        }
    }

    /// Without an explicit status the outcome is classified from the counts
    fn complete(&mut self, status: Option<ExecutionStatus>, now: DateTime<Utc>) {
        self.status = status.unwrap_or_else(|| classify(&self.summary()));
        self.end_time = Some(now);
        let elapsed = (now - self.start_time).num_milliseconds().max(0);
        self.duration_ms = Some(elapsed as u64);
        log::debug!("execution {} completed as {}", self.id, self.status);
    }
}

#[cfg(test)]
#[path = "execution_test.rs"]
mod tests;
