use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::Ledger;
use crate::audit::EntityKind;
use crate::test_case::validate_steps;

/// One inconsistency found by [`Ledger::check_integrity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityIssue {
    pub entity: EntityKind,
    pub id: String,
    pub message: String,
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.entity, self.id, self.message)
    }
}

impl Ledger {
    /// Recompute every derived value and cross-reference, reporting drift.
    ///
    /// An empty result means the cached coverage, references, version
    /// histories and execution summaries are all consistent.
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        let mut issue = |entity: EntityKind, id: &str, message: String| {
            issues.push(IntegrityIssue {
                entity,
                id: id.to_string(),
                message,
            })
        };

        for (id, history) in &self.requirements {
            let current = history.current();
            if !self.projects.contains_key(&current.project_id) {
                issue(
                    EntityKind::Requirement,
                    id,
                    format!("references missing project '{}'", current.project_id),
                );
            }
            if !history.is_monotonic() {
                issue(EntityKind::Requirement, id, "version history has gaps".into());
            }
            let coverage = self.compute_coverage(id);
            if coverage.status != current.coverage_status {
                issue(
                    EntityKind::Requirement,
                    id,
                    format!(
                        "cached coverage {} but recomputed {}",
                        current.coverage_status, coverage.status
                    ),
                );
            }
            if coverage.linked_test_cases != current.linked_test_cases {
                issue(
                    EntityKind::Requirement,
                    id,
                    format!(
                        "cached {} linked test cases but found {}",
                        current.linked_test_cases, coverage.linked_test_cases
                    ),
                );
            }
        }

        for (id, scenario) in &self.scenarios {
            match self.requirements.get(&scenario.requirement_id) {
                None => issue(
                    EntityKind::Scenario,
                    id,
                    format!("references missing requirement '{}'", scenario.requirement_id),
                ),
                Some(history) if history.get(scenario.requirement_version).is_none() => issue(
                    EntityKind::Scenario,
                    id,
                    format!(
                        "derived from {} of '{}', which does not exist",
                        scenario.requirement_version, scenario.requirement_id
                    ),
                ),
                Some(_) => {}
            }
        }

        for (id, history) in &self.test_cases {
            if !history.is_monotonic() {
                issue(EntityKind::TestCase, id, "version history has gaps".into());
            }
            for case in history.versions() {
                if let Err(e) = validate_steps(&case.steps) {
                    issue(
                        EntityKind::TestCase,
                        id,
                        format!("{}: {e}", case.version),
                    );
                }
            }
            let current = history.current();
            match self.scenarios.get(&current.scenario_id) {
                None => issue(
                    EntityKind::TestCase,
                    id,
                    format!("references missing scenario '{}'", current.scenario_id),
                ),
                Some(scenario) if scenario.requirement_id != current.requirement_id => issue(
                    EntityKind::TestCase,
                    id,
                    format!(
                        "requirement '{}' disagrees with scenario '{}' under '{}'",
                        current.requirement_id, scenario.id, scenario.requirement_id
                    ),
                ),
                Some(_) => {}
            }
        }

        for (id, history) in &self.scripts {
            if !history.is_monotonic() {
                issue(EntityKind::Script, id, "version history has gaps".into());
            }
            let current = history.current();
            match self.test_cases.get(&current.test_case_id) {
                None => issue(
                    EntityKind::Script,
                    id,
                    format!("references missing test case '{}'", current.test_case_id),
                ),
                Some(cases) => {
                    if cases.get(current.test_case_version).is_none() {
                        issue(
                            EntityKind::Script,
                            id,
                            format!(
                                "generated from {} of '{}', which does not exist",
                                current.test_case_version, current.test_case_id
                            ),
                        );
                    }
                    if cases.current().requirement_id != current.requirement_id {
                        issue(
                            EntityKind::Script,
                            id,
                            "requirement disagrees with its test case".into(),
                        );
                    }
                }
            }
            for version in history.versions() {
                if !version.framework.supports(version.language) {
                    issue(
                        EntityKind::Script,
                        id,
                        format!(
                            "{}: {} does not support {}",
                            version.version, version.framework, version.language
                        ),
                    );
                }
            }
        }

        for (id, execution) in &self.executions {
            if !self.projects.contains_key(&execution.project_id) {
                issue(
                    EntityKind::Execution,
                    id,
                    format!("references missing project '{}'", execution.project_id),
                );
            }
            let mut reported = BTreeSet::new();
            for result in execution.results() {
                if result.execution_id != *id {
                    issue(
                        EntityKind::Execution,
                        id,
                        format!("holds result '{}' of another execution", result.id),
                    );
                }
                if !execution.plan.iter().any(|p| p.test_case_id == result.test_case_id) {
                    issue(
                        EntityKind::Execution,
                        id,
                        format!("result for unplanned test case '{}'", result.test_case_id),
                    );
                }
                if !reported.insert(&result.test_case_id) {
                    issue(
                        EntityKind::Execution,
                        id,
                        format!("several results for '{}'", result.test_case_id),
                    );
                }
            }
            for run in &execution.plan {
                let pinned = self
                    .scripts
                    .get(&run.script_id)
                    .map(|h| h.get(run.script_version).is_some());
                if pinned != Some(true) {
                    issue(
                        EntityKind::Execution,
                        id,
                        format!(
                            "plans {} of '{}', which does not exist",
                            run.script_version, run.script_id
                        ),
                    );
                }
            }
            if execution.is_finished() != execution.end_time.is_some() {
                issue(
                    EntityKind::Execution,
                    id,
                    format!("status {} disagrees with end time", execution.status),
                );
            }
        }

        if let Err(e) = self.trace_graph().validate() {
            issue(EntityKind::Project, "*", e.to_string());
        }

        let out_of_order = self
            .audit
            .windows(2)
            .any(|w| w[1].seq <= w[0].seq);
        if out_of_order {
            issue(EntityKind::Project, "*", "audit log sequence is not increasing".into());
        }

        issues
    }
}
