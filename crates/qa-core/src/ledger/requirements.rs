use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::{check_expected, Ledger, Transition};
use crate::audit::EntityKind;
use crate::coverage::Coverage;
use crate::error::{CoreError, CoreResult};
use crate::history::VersionHistory;
use crate::ids::{ProjectId, RequirementId, ScenarioId};
use crate::lifecycle::{precondition, requirement_transition, RequirementAction};
use crate::requirement::{
    AnalysisOutcome, CoverageStatus, NewRequirement, Requirement, RequirementRevision,
    RequirementStatus,
};
use crate::test_case::TestCase;
use crate::version::Version;

impl Ledger {
    /// Ingest a requirement in draft. Release and owner default to the
    /// project's.
    pub fn ingest_requirement(
        &mut self,
        project_id: &ProjectId,
        input: NewRequirement,
        now: DateTime<Utc>,
    ) -> CoreResult<RequirementId> {
        input.validate()?;
        let project = self.active_project(project_id, "ingest a requirement into")?;
        let release = non_blank_or(input.release, &project.release);
        let owner = non_blank_or(input.owner, &project.owner);

        let id = self.sequences.next_requirement();
        let requirement = Requirement {
            id: id.clone(),
            project_id: project_id.clone(),
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            acceptance_criteria: input
                .acceptance_criteria
                .iter()
                .map(|c| c.trim().to_string())
                .collect(),
            release,
            owner,
            status: RequirementStatus::Draft,
            version: Version::INITIAL,
            analysis: None,
            issues: Vec::new(),
            clarifications: Vec::new(),
            linked_test_cases: 0,
            coverage_status: CoverageStatus::NotGenerated,
            created_at: now,
            last_modified: now,
        };
        self.requirements
            .insert(id.clone(), VersionHistory::new(requirement));
        self.record(
            now,
            EntityKind::Requirement,
            &id,
            "ingest",
            Transition::created(RequirementStatus::Draft),
            Some(Version::INITIAL),
        );
        Ok(id)
    }

    /// Current version of a requirement
    pub fn requirement(&self, id: &RequirementId) -> CoreResult<&Requirement> {
        self.requirement_history(id).map(VersionHistory::current)
    }

    pub fn requirement_history(
        &self,
        id: &RequirementId,
    ) -> CoreResult<&VersionHistory<Requirement>> {
        self.requirements
            .get(id)
            .ok_or_else(|| CoreError::not_found("requirement", id))
    }

    /// Current versions, optionally restricted to one project
    pub fn requirements<'a>(
        &'a self,
        project_id: Option<&'a ProjectId>,
    ) -> impl Iterator<Item = &'a Requirement> + 'a {
        self.requirements
            .values()
            .map(VersionHistory::current)
            .filter(move |r| project_id.map_or(true, |p| &r.project_id == p))
    }

    fn requirement_mut(&mut self, id: &RequirementId) -> CoreResult<&mut Requirement> {
        self.requirements
            .get_mut(id)
            .map(VersionHistory::current_mut)
            .ok_or_else(|| CoreError::not_found("requirement", id))
    }

    /// Apply a status transition in place and audit it
    pub(crate) fn transition_requirement(
        &mut self,
        id: &RequirementId,
        action: RequirementAction,
        now: DateTime<Utc>,
    ) -> CoreResult<RequirementStatus> {
        let requirement = self.requirement_mut(id)?;
        let from = requirement.status;
        let to = requirement_transition(id, from, action)?;
        requirement.status = to;
        requirement.last_modified = now;
        let version = requirement.version;
        self.record(
            now,
            EntityKind::Requirement,
            id,
            action.name().trim_end_matches(" for"),
            Transition::moved(from, to),
            Some(version),
        );
        Ok(to)
    }

    /// Store the analysis of the current version and move out of draft.
    pub fn record_analysis(
        &mut self,
        id: &RequirementId,
        expected: Option<Version>,
        outcome: AnalysisOutcome,
        now: DateTime<Utc>,
    ) -> CoreResult<RequirementStatus> {
        let current = self.requirement(id)?;
        check_expected("requirement", id, current.version, expected)?;
        let action = RequirementAction::Analyze {
            needs_clarification: outcome.needs_clarification(),
        };
        requirement_transition(id, current.status, action)?;

        let requirement = self.requirement_mut(id)?;
        requirement.analysis = Some(outcome.analysis);
        requirement.issues = outcome.issues;
        self.transition_requirement(id, action, now)
    }

    /// Resolve a clarification request with the answer given by a person.
    pub fn clarify_requirement(
        &mut self,
        id: &RequirementId,
        expected: Option<Version>,
        clarification: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<RequirementStatus> {
        if clarification.trim().is_empty() {
            return Err(CoreError::validation(
                "requirement",
                "clarification must not be empty",
            ));
        }
        let current = self.requirement(id)?;
        check_expected("requirement", id, current.version, expected)?;
        requirement_transition(id, current.status, RequirementAction::ResolveClarification)?;

        let requirement = self.requirement_mut(id)?;
        requirement
            .clarifications
            .push(clarification.trim().to_string());
        self.transition_requirement(id, RequirementAction::ResolveClarification, now)
    }

    /// Edit requirement content. Pushes a new version in draft, clearing the
    /// analysis. Existing scenarios keep pointing at the version they were
    /// derived from and drop out of coverage.
    pub fn revise_requirement(
        &mut self,
        id: &RequirementId,
        expected: Option<Version>,
        revision: RequirementRevision,
        now: DateTime<Utc>,
    ) -> CoreResult<Version> {
        let current = self.requirement(id)?;
        check_expected("requirement", id, current.version, expected)?;
        let from = current.status;
        requirement_transition(id, from, RequirementAction::Revise)?;
        if revision.is_empty() {
            return Err(CoreError::validation("requirement", "nothing to revise"));
        }
        let mut next = revision.apply(current)?.ok_or_else(|| {
            CoreError::validation("requirement", "revision does not change the content")
        })?;
        next.version = current.version.next();
        next.status = RequirementStatus::Draft;
        next.analysis = None;
        next.issues.clear();
        next.clarifications.clear();
        next.last_modified = now;
        let version = next.version;

        if let Some(history) = self.requirements.get_mut(id) {
            history.push(next)?;
        }
        // scenarios of the previous version no longer count
        self.refresh_coverage(id)?;
        self.record(
            now,
            EntityKind::Requirement,
            id,
            "revise",
            Transition::moved(from, RequirementStatus::Draft),
            Some(version),
        );
        Ok(version)
    }

    /// Approve a requirement whose scenarios are all covered.
    pub fn approve_requirement(
        &mut self,
        id: &RequirementId,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let current = self.requirement(id)?;
        check_expected("requirement", id, current.version, expected)?;
        requirement_transition(id, current.status, RequirementAction::Approve)?;
        let coverage = self.compute_coverage(id);
        if coverage.status != CoverageStatus::Complete {
            return Err(precondition(
                "requirement",
                id,
                "approve",
                format!("coverage {}", coverage.status),
                &["coverage complete"],
            ));
        }
        self.transition_requirement(id, RequirementAction::Approve, now)?;
        Ok(())
    }

    pub fn archive_requirement(&mut self, id: &RequirementId, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition_requirement(id, RequirementAction::Archive, now)?;
        Ok(())
    }

    /// The requirement, failing if it is archived
    pub(crate) fn open_requirement(
        &self,
        id: &RequirementId,
        action: &str,
    ) -> CoreResult<&Requirement> {
        let requirement = self.requirement(id)?;
        if requirement.status == RequirementStatus::Archived {
            return Err(precondition(
                "requirement",
                id,
                action,
                requirement.status,
                RequirementAction::Archive.allowed_from(),
            ));
        }
        Ok(requirement)
    }

    /// Coverage recomputed from the current version's scenarios and their
    /// test cases
    pub fn compute_coverage(&self, id: &RequirementId) -> Coverage {
        let scenarios: BTreeSet<&ScenarioId> =
            self.current_scenarios_for(id).map(|s| &s.id).collect();
        let cases: Vec<&TestCase> = self
            .test_cases
            .values()
            .map(VersionHistory::current)
            .filter(|c| scenarios.contains(&c.scenario_id))
            .collect();
        Coverage::compute(scenarios.iter().copied(), &cases)
    }

    /// Refresh the cached coverage fields on the requirement.
    pub(crate) fn refresh_coverage(&mut self, id: &RequirementId) -> CoreResult<Coverage> {
        let coverage = self.compute_coverage(id);
        let requirement = self.requirement_mut(id)?;
        if requirement.coverage_status != coverage.status {
            log::debug!(
                "requirement {id} coverage {} -> {}",
                requirement.coverage_status,
                coverage.status
            );
        }
        requirement.coverage_status = coverage.status;
        requirement.linked_test_cases = coverage.linked_test_cases;
        Ok(coverage)
    }
}

fn non_blank_or(value: String, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
