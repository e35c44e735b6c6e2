use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::{Ledger, Transition};
use crate::audit::EntityKind;
use crate::error::{CoreError, CoreResult};
use crate::execution::{Execution, ExecutionStatus, PlannedRun, ResultInput};
use crate::ids::{ExecutionId, ProjectId, ResultId, ScriptId, TestCaseId};
use crate::lifecycle::precondition;
use crate::requirement::RequirementStatus;
use crate::script::{AutomationScript, ScriptStatus};

impl Ledger {
    /// Start an execution of approved scripts in an active project.
    ///
    /// Without an explicit selection every approved script under the
    /// project's open requirements is planned, one per test case. The plan
    /// pins each script's current version.
    pub fn start_execution(
        &mut self,
        project_id: &ProjectId,
        selection: Option<&[ScriptId]>,
        triggered_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<ExecutionId> {
        self.active_project(project_id, "start an execution in")?;
        let plan = match selection {
            Some(ids) => self.selected_plan(project_id, ids)?,
            None => self.default_plan(project_id),
        };
        if plan.is_empty() {
            return Err(precondition(
                "project",
                project_id,
                "start an execution in",
                "no approved scripts",
                &["at least one approved script"],
            ));
        }

        let id = self.sequences.next_execution();
        let triggered_by = if triggered_by.trim().is_empty() {
            self.actor.clone()
        } else {
            triggered_by.trim().to_string()
        };
        let execution = Execution::new(id.clone(), project_id.clone(), plan, triggered_by, now)?;
        let planned = execution.plan.len();
        self.executions.insert(id.clone(), execution);
        self.record(
            now,
            EntityKind::Execution,
            &id,
            &format!("start ({planned} planned)"),
            Transition::created(ExecutionStatus::Running),
            None,
        );
        Ok(id)
    }

    fn project_of(&self, script: &AutomationScript) -> Option<&ProjectId> {
        self.requirements
            .get(&script.requirement_id)
            .map(|h| &h.current().project_id)
    }

    fn default_plan(&self, project_id: &ProjectId) -> Vec<PlannedRun> {
        let mut by_case: BTreeMap<&TestCaseId, &AutomationScript> = BTreeMap::new();
        for script in self.scripts() {
            let open = self
                .requirements
                .get(&script.requirement_id)
                .map(|h| h.current())
                .is_some_and(|r| {
                    &r.project_id == project_id && r.status != RequirementStatus::Archived
                });
            if !open || script.status != ScriptStatus::Approved {
                continue;
            }
            // most recently approved script wins when a case has several
            by_case
                .entry(&script.test_case_id)
                .and_modify(|s| {
                    if script.approved_at > s.approved_at {
                        *s = script;
                    }
                })
                .or_insert(script);
        }
        by_case.into_values().map(planned_run).collect()
    }

    fn selected_plan(
        &self,
        project_id: &ProjectId,
        ids: &[ScriptId],
    ) -> CoreResult<Vec<PlannedRun>> {
        let mut plan: Vec<PlannedRun> = Vec::with_capacity(ids.len());
        for id in ids {
            let script = self.script(id)?;
            if self.project_of(script) != Some(project_id) {
                return Err(CoreError::validation(
                    "execution",
                    format!("script '{id}' does not belong to project '{project_id}'"),
                ));
            }
            if script.status != ScriptStatus::Approved {
                return Err(precondition(
                    "script",
                    id,
                    "execute",
                    script.status,
                    &[ScriptStatus::Approved],
                ));
            }
            if plan.iter().any(|p| p.test_case_id == script.test_case_id) {
                return Err(CoreError::validation(
                    "execution",
                    format!(
                        "test case '{}' is selected more than once",
                        script.test_case_id
                    ),
                ));
            }
            plan.push(planned_run(script));
        }
        Ok(plan)
    }

    pub fn execution(&self, id: &ExecutionId) -> CoreResult<&Execution> {
        self.executions
            .get(id)
            .ok_or_else(|| CoreError::not_found("execution", id))
    }

    /// Executions, optionally restricted to one project
    pub fn executions<'a>(
        &'a self,
        project_id: Option<&'a ProjectId>,
    ) -> impl Iterator<Item = &'a Execution> + 'a {
        self.executions
            .values()
            .filter(move |e| project_id.map_or(true, |p| &e.project_id == p))
    }

    fn execution_mut(&mut self, id: &ExecutionId) -> CoreResult<&mut Execution> {
        self.executions
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("execution", id))
    }

    /// Append a runner-reported result. Returns the result id.
    pub fn record_result(
        &mut self,
        id: &ExecutionId,
        input: ResultInput,
        now: DateTime<Utc>,
    ) -> CoreResult<ResultId> {
        // allocate from a copy so a rejected result does not burn an id
        let mut sequences = self.sequences.clone();
        let result_id = sequences.next_result();
        let test_case_id = input.test_case_id.clone();
        let status = input.status;

        let execution = self.execution_mut(id)?;
        let completed = execution.record(result_id.clone(), input, now)?;
        let final_status = execution.status;
        self.sequences = sequences;

        self.record(
            now,
            EntityKind::Execution,
            id,
            &format!("record {test_case_id} {status}"),
            Transition::none(),
            None,
        );
        if completed {
            self.record(
                now,
                EntityKind::Execution,
                id,
                "complete",
                Transition::moved(ExecutionStatus::Running, final_status),
                None,
            );
        }
        Ok(result_id)
    }

    /// Complete early; unreported runs are recorded as skipped.
    pub fn finish_execution(&mut self, id: &ExecutionId, now: DateTime<Utc>) -> CoreResult<ExecutionStatus> {
        let execution = self
            .executions
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("execution", id))?;
        execution.finish(now, || self.sequences.next_result())?;
        let status = execution.status;
        self.record(
            now,
            EntityKind::Execution,
            id,
            "finish",
            Transition::moved(ExecutionStatus::Running, status),
            None,
        );
        Ok(status)
    }

    /// Cancel; in-flight runs are recorded as skipped.
    pub fn cancel_execution(&mut self, id: &ExecutionId, now: DateTime<Utc>) -> CoreResult<()> {
        let execution = self
            .executions
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("execution", id))?;
        execution.cancel(now, || self.sequences.next_result())?;
        self.record(
            now,
            EntityKind::Execution,
            id,
            "cancel",
            Transition::moved(ExecutionStatus::Running, ExecutionStatus::Cancelled),
            None,
        );
        Ok(())
    }
}

fn planned_run(script: &AutomationScript) -> PlannedRun {
    PlannedRun {
        test_case_id: script.test_case_id.clone(),
        script_id: script.id.clone(),
        script_version: script.version,
    }
}
