use super::Ledger;
use crate::audit::EntityKind;
use crate::error::CoreResult;
use crate::execution::Execution;
use crate::ids::{ProjectId, RequirementId};
use crate::metrics::{
    automation_rate, flaky_tests, latest_finished, pass_rate, percent, DashboardMetrics,
    PendingApprovals, ProjectSummary,
};
use crate::requirement::RequirementStatus;
use crate::scenario::ScenarioStatus;
use crate::script::{AutomationScript, ScriptStatus};
use crate::test_case::TestCase;
use crate::trace::{TraceGraph, TraceNode};

impl Ledger {
    fn in_scope(&self, requirement_id: &RequirementId, project_id: Option<&ProjectId>) -> bool {
        match project_id {
            None => true,
            Some(p) => self
                .requirement(requirement_id)
                .is_ok_and(|r| &r.project_id == p),
        }
    }

    /// Work under an archived requirement can no longer be reviewed
    fn reviewable(&self, requirement_id: &RequirementId) -> bool {
        self.requirement(requirement_id)
            .is_ok_and(|r| r.status != RequirementStatus::Archived)
    }

    /// Dashboard metrics for one project, or for all projects
    pub fn dashboard(&self, project_id: Option<&ProjectId>, flaky_window: usize) -> DashboardMetrics {
        let cases: Vec<&TestCase> = self
            .test_cases(None)
            .filter(|c| self.in_scope(&c.requirement_id, project_id))
            .collect();
        let scripts: Vec<&AutomationScript> = self
            .scripts()
            .filter(|s| self.in_scope(&s.requirement_id, project_id))
            .collect();
        let executions: Vec<&Execution> = self.executions(project_id).collect();

        let pending = PendingApprovals {
            scenarios: self
                .scenarios
                .values()
                .filter(|s| s.status == ScenarioStatus::Draft)
                .filter(|s| self.in_scope(&s.requirement_id, project_id))
                .filter(|s| self.reviewable(&s.requirement_id))
                .count(),
            test_cases: cases
                .iter()
                .filter(|c| c.status.is_pending() && self.reviewable(&c.requirement_id))
                .count(),
            scripts: scripts
                .iter()
                .filter(|s| s.status == ScriptStatus::Draft && self.reviewable(&s.requirement_id))
                .count(),
        };

        DashboardMetrics {
            project_id: project_id.cloned(),
            automation_rate: automation_rate(&cases, &scripts),
            pass_rate: pass_rate(&executions),
            pending_approvals: pending,
            flaky_tests: flaky_tests(&executions, flaky_window),
            token_usage: self.token_usage(project_id),
        }
    }

    /// Derived figures for one project
    pub fn project_summary(&self, project_id: &ProjectId) -> CoreResult<ProjectSummary> {
        self.project(project_id)?;
        let (mut scenarios, mut covered, mut requirements) = (0, 0, 0);
        for requirement in self.requirements(Some(project_id)) {
            requirements += 1;
            if requirement.status == RequirementStatus::Archived {
                continue;
            }
            let coverage = self.compute_coverage(&requirement.id);
            scenarios += coverage.scenarios;
            covered += coverage.covered_scenarios;
        }
        let executions: Vec<&Execution> = self.executions(Some(project_id)).collect();
        Ok(ProjectSummary {
            project_id: project_id.clone(),
            requirements,
            coverage_percent: percent(covered, scenarios),
            pass_rate: latest_finished(&executions)
                .and_then(|e| e.summary().pass_rate()),
            last_execution: executions.iter().map(|e| e.start_time).max(),
        })
    }

    /// Traceability graph over every entity in the ledger
    pub fn trace_graph(&self) -> TraceGraph {
        let mut graph = TraceGraph::new();
        for project in self.projects.values() {
            graph.add_node(TraceNode::new(EntityKind::Project, project.id.as_str()));
        }
        for requirement in self.requirements(None) {
            graph.add_link(
                TraceNode::new(EntityKind::Project, requirement.project_id.as_str()),
                TraceNode::new(EntityKind::Requirement, requirement.id.as_str()),
            );
        }
        for scenario in self.scenarios.values() {
            graph.add_link(
                TraceNode::new(EntityKind::Requirement, scenario.requirement_id.as_str()),
                TraceNode::new(EntityKind::Scenario, scenario.id.as_str()),
            );
        }
        for case in self.test_cases(None) {
            graph.add_link(
                TraceNode::new(EntityKind::Scenario, case.scenario_id.as_str()),
                TraceNode::new(EntityKind::TestCase, case.id.as_str()),
            );
        }
        for script in self.scripts() {
            graph.add_link(
                TraceNode::new(EntityKind::TestCase, script.test_case_id.as_str()),
                TraceNode::new(EntityKind::Script, script.id.as_str()),
            );
        }
        for execution in self.executions.values() {
            for run in &execution.plan {
                graph.add_link(
                    TraceNode::new(EntityKind::Script, run.script_id.as_str()),
                    TraceNode::new(EntityKind::Execution, execution.id.as_str()),
                );
            }
        }
        graph
    }
}
