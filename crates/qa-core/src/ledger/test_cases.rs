use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::{check_expected, Ledger, Transition};
use crate::audit::EntityKind;
use crate::error::{CoreError, CoreResult};
use crate::history::VersionHistory;
use crate::ids::{RequirementId, ScenarioId, TestCaseId};
use crate::lifecycle::{
    precondition, requirement_transition, test_case_transition, RequirementAction,
    TestCaseAction, REVIEWABLE_REQUIREMENT,
};
use crate::test_case::{number_steps, TestCase, TestCaseDraft, TestCaseStatus};
use crate::version::Version;

impl Ledger {
    /// Attach generated test cases, grouped by scenario, and move the
    /// requirement to test-cases-generated.
    ///
    /// A scenario that already has a live (non-rejected) test case cannot
    /// receive generated ones; regeneration only fills the gaps.
    pub fn add_generated_test_cases(
        &mut self,
        requirement_id: &RequirementId,
        batch: Vec<(ScenarioId, Vec<TestCaseDraft>)>,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<TestCaseId>> {
        let requirement = self.requirement(requirement_id)?;
        requirement_transition(
            requirement_id,
            requirement.status,
            RequirementAction::GenerateTestCases,
        )?;
        self.active_project(&requirement.project_id, "generate test cases in")?;

        let mut seen = BTreeSet::new();
        for (scenario_id, drafts) in &batch {
            let scenario = self.scenario(scenario_id)?;
            if &scenario.requirement_id != requirement_id {
                return Err(CoreError::validation(
                    "test case",
                    format!(
                        "scenario '{scenario_id}' belongs to '{}', not '{requirement_id}'",
                        scenario.requirement_id
                    ),
                ));
            }
            let current = requirement.version;
            if scenario.requirement_version != current {
                return Err(CoreError::validation(
                    "test case",
                    format!(
                        "scenario '{scenario_id}' was derived from {} of '{requirement_id}', now at {current}",
                        scenario.requirement_version
                    ),
                ));
            }
            if !seen.insert(scenario_id) {
                return Err(CoreError::validation(
                    "test case",
                    format!("scenario '{scenario_id}' appears twice in one batch"),
                ));
            }
            if self.live_cases_for(scenario_id) > 0 {
                return Err(CoreError::conflict(
                    "scenario",
                    scenario_id,
                    "already has test cases",
                ));
            }
            for draft in drafts {
                draft.validate()?;
            }
        }
        if batch.iter().all(|(_, drafts)| drafts.is_empty()) {
            return Err(CoreError::validation(
                "test case",
                "generation produced no test cases",
            ));
        }

        let mut ids = Vec::new();
        for (scenario_id, drafts) in batch {
            for draft in drafts {
                ids.push(self.insert_test_case(requirement_id, &scenario_id, draft, "generate", now));
            }
        }
        self.transition_requirement(requirement_id, RequirementAction::GenerateTestCases, now)?;
        self.refresh_coverage(requirement_id)?;
        Ok(ids)
    }

    /// Add a test case by hand under an existing scenario.
    pub fn add_manual_test_case(
        &mut self,
        scenario_id: &ScenarioId,
        draft: TestCaseDraft,
        now: DateTime<Utc>,
    ) -> CoreResult<TestCaseId> {
        draft.validate()?;
        let requirement_id = self.scenario(scenario_id)?.requirement_id.clone();
        let requirement = self.requirement(&requirement_id)?;
        if !REVIEWABLE_REQUIREMENT.contains(&requirement.status) {
            return Err(precondition(
                "requirement",
                &requirement_id,
                "add a test case to",
                requirement.status,
                REVIEWABLE_REQUIREMENT,
            ));
        }
        self.active_project(&requirement.project_id, "add a test case in")?;
        let id = self.insert_test_case(&requirement_id, scenario_id, draft, "add", now);
        self.refresh_coverage(&requirement_id)?;
        Ok(id)
    }

    fn insert_test_case(
        &mut self,
        requirement_id: &RequirementId,
        scenario_id: &ScenarioId,
        draft: TestCaseDraft,
        action: &str,
        now: DateTime<Utc>,
    ) -> TestCaseId {
        let id = self.sequences.next_test_case();
        let case = TestCase {
            id: id.clone(),
            scenario_id: scenario_id.clone(),
            requirement_id: requirement_id.clone(),
            title: draft.title.trim().to_string(),
            priority: draft.priority,
            test_type: draft.test_type,
            preconditions: draft.preconditions,
            steps: number_steps(&draft.steps),
            expected_results: draft.expected_results,
            postconditions: draft.postconditions,
            status: TestCaseStatus::Draft,
            version: Version::INITIAL,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
        };
        self.test_cases.insert(id.clone(), VersionHistory::new(case));
        self.record(
            now,
            EntityKind::TestCase,
            &id,
            action,
            Transition::created(TestCaseStatus::Draft),
            Some(Version::INITIAL),
        );
        id
    }

    /// Current version of a test case
    pub fn test_case(&self, id: &TestCaseId) -> CoreResult<&TestCase> {
        self.test_case_history(id).map(VersionHistory::current)
    }

    pub fn test_case_history(&self, id: &TestCaseId) -> CoreResult<&VersionHistory<TestCase>> {
        self.test_cases
            .get(id)
            .ok_or_else(|| CoreError::not_found("test case", id))
    }

    /// Current versions, optionally restricted to one requirement
    pub fn test_cases<'a>(
        &'a self,
        requirement_id: Option<&'a RequirementId>,
    ) -> impl Iterator<Item = &'a TestCase> + 'a {
        self.test_cases
            .values()
            .map(VersionHistory::current)
            .filter(move |c| requirement_id.map_or(true, |r| &c.requirement_id == r))
    }

    /// Current versions under one scenario
    pub fn test_cases_for_scenario<'a>(
        &'a self,
        scenario_id: &'a ScenarioId,
    ) -> impl Iterator<Item = &'a TestCase> + 'a {
        self.test_cases(None)
            .filter(move |c| &c.scenario_id == scenario_id)
    }

    /// Number of current test cases under a scenario that are not rejected
    pub fn live_cases_for(&self, scenario_id: &ScenarioId) -> usize {
        self.test_cases_for_scenario(scenario_id)
            .filter(|c| c.status != TestCaseStatus::Rejected)
            .count()
    }

    /// Push an edited version. Pending cases move to `edited`; reviewed
    /// cases fork a fresh `draft`.
    pub fn edit_test_case(
        &mut self,
        id: &TestCaseId,
        expected: Option<Version>,
        draft: TestCaseDraft,
        now: DateTime<Utc>,
    ) -> CoreResult<Version> {
        draft.validate()?;
        let current = self.test_case(id)?;
        check_expected("test case", id, current.version, expected)?;
        self.open_requirement(&current.requirement_id, "edit a test case of")?;
        if draft.checksum() == current.content_checksum() {
            return Err(CoreError::validation(
                "test case",
                "edit does not change the content",
            ));
        }
        let from = current.status;
        let to = test_case_transition(id, from, TestCaseAction::Edit)?;
        let next = draft.apply_to(current, to, now);
        let version = next.version;
        let requirement_id = current.requirement_id.clone();

        if let Some(history) = self.test_cases.get_mut(id) {
            history.push(next)?;
        }
        self.record(
            now,
            EntityKind::TestCase,
            id,
            "edit",
            Transition::moved(from, to),
            Some(version),
        );
        self.refresh_coverage(&requirement_id)?;
        Ok(version)
    }

    /// Approve the current version. The requirement must be past scenario
    /// generation.
    pub fn approve_test_case(
        &mut self,
        id: &TestCaseId,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.review_test_case(id, expected, TestCaseAction::Approve, now)
    }

    pub fn reject_test_case(
        &mut self,
        id: &TestCaseId,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.review_test_case(id, expected, TestCaseAction::Reject, now)
    }

    fn review_test_case(
        &mut self,
        id: &TestCaseId,
        expected: Option<Version>,
        action: TestCaseAction,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let name = match action {
            TestCaseAction::Approve => "approve",
            TestCaseAction::Reject => "reject",
            TestCaseAction::Edit => "edit",
        };
        let current = self.test_case(id)?;
        check_expected("test case", id, current.version, expected)?;
        let requirement = self.requirement(&current.requirement_id)?;
        if !REVIEWABLE_REQUIREMENT.contains(&requirement.status) {
            return Err(precondition(
                "requirement",
                &requirement.id,
                &format!("{name} a test case of"),
                requirement.status,
                REVIEWABLE_REQUIREMENT,
            ));
        }
        let from = current.status;
        let to = test_case_transition(id, from, action)?;
        let version = current.version;
        let requirement_id = current.requirement_id.clone();

        if let Some(history) = self.test_cases.get_mut(id) {
            let case = history.current_mut();
            case.status = to;
            case.updated_at = now;
        }
        self.record(
            now,
            EntityKind::TestCase,
            id,
            name,
            Transition::moved(from, to),
            Some(version),
        );
        self.refresh_coverage(&requirement_id)?;
        Ok(())
    }
}
