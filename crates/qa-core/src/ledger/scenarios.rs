use chrono::{DateTime, Utc};

use super::{Ledger, Transition};
use crate::audit::EntityKind;
use crate::error::{CoreError, CoreResult};
use crate::ids::{RequirementId, ScenarioId};
use crate::lifecycle::{
    precondition, requirement_transition, scenario_transition, RequirementAction, ScenarioAction,
};
use crate::requirement::RequirementStatus;
use crate::scenario::{Origin, ScenarioDraft, ScenarioStatus, TestScenario};
use crate::version::Version;

/// Requirement states in which scenarios may be added by hand
const ACCEPTS_MANUAL_SCENARIOS: &[RequirementStatus] = &[
    RequirementStatus::ScenariosGenerated,
    RequirementStatus::TestCasesGenerated,
];

impl Ledger {
    /// Attach generated scenarios to a ready requirement and move it to
    /// scenarios-generated. Either every draft is stored or none is.
    pub fn add_generated_scenarios(
        &mut self,
        requirement_id: &RequirementId,
        drafts: Vec<ScenarioDraft>,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<ScenarioId>> {
        let requirement = self.requirement(requirement_id)?;
        requirement_transition(
            requirement_id,
            requirement.status,
            RequirementAction::GenerateScenarios,
        )?;
        self.active_project(&requirement.project_id, "generate scenarios in")?;
        if drafts.is_empty() {
            return Err(CoreError::validation(
                "scenario",
                "generation produced no scenarios",
            ));
        }
        for draft in &drafts {
            draft.validate()?;
        }

        let version = requirement.version;
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            ids.push(self.insert_scenario(requirement_id, version, draft, Origin::Generated, now));
        }
        self.transition_requirement(requirement_id, RequirementAction::GenerateScenarios, now)?;
        self.refresh_coverage(requirement_id)?;
        Ok(ids)
    }

    /// Add a scenario by hand to a requirement that already has generated ones.
    pub fn add_manual_scenario(
        &mut self,
        requirement_id: &RequirementId,
        draft: ScenarioDraft,
        now: DateTime<Utc>,
    ) -> CoreResult<ScenarioId> {
        draft.validate()?;
        let requirement = self.requirement(requirement_id)?;
        if !ACCEPTS_MANUAL_SCENARIOS.contains(&requirement.status) {
            return Err(precondition(
                "requirement",
                requirement_id,
                "add a scenario to",
                requirement.status,
                ACCEPTS_MANUAL_SCENARIOS,
            ));
        }
        let version = requirement.version;
        let id = self.insert_scenario(requirement_id, version, draft, Origin::Manual, now);
        self.refresh_coverage(requirement_id)?;
        Ok(id)
    }

    fn insert_scenario(
        &mut self,
        requirement_id: &RequirementId,
        requirement_version: Version,
        draft: ScenarioDraft,
        origin: Origin,
        now: DateTime<Utc>,
    ) -> ScenarioId {
        let id = self.sequences.next_scenario();
        let scenario = TestScenario {
            id: id.clone(),
            requirement_id: requirement_id.clone(),
            requirement_version,
            title: draft.title.trim().to_string(),
            scenario_type: draft.scenario_type,
            description: draft.description.trim().to_string(),
            preconditions: draft.preconditions,
            expected_outcome: draft.expected_outcome,
            status: ScenarioStatus::Draft,
            origin,
            created_at: now,
        };
        self.scenarios.insert(id.clone(), scenario);
        self.record(
            now,
            EntityKind::Scenario,
            &id,
            match origin {
                Origin::Generated => "generate",
                Origin::Manual => "add",
            },
            Transition::created(ScenarioStatus::Draft),
            None,
        );
        id
    }

    pub fn scenario(&self, id: &ScenarioId) -> CoreResult<&TestScenario> {
        self.scenarios
            .get(id)
            .ok_or_else(|| CoreError::not_found("scenario", id))
    }

    /// Scenarios of one requirement, in id order
    pub fn scenarios_for<'a>(
        &'a self,
        requirement_id: &'a RequirementId,
    ) -> impl Iterator<Item = &'a TestScenario> + 'a {
        self.scenarios
            .values()
            .filter(move |s| &s.requirement_id == requirement_id)
    }

    /// Scenarios derived from the requirement's current version.
    ///
    /// A revision leaves earlier scenarios in place for history, but only
    /// these count toward coverage and receive generated test cases.
    pub fn current_scenarios_for<'a>(
        &'a self,
        requirement_id: &'a RequirementId,
    ) -> impl Iterator<Item = &'a TestScenario> + 'a {
        let version = self.requirement(requirement_id).ok().map(|r| r.version);
        self.scenarios_for(requirement_id)
            .filter(move |s| Some(s.requirement_version) == version)
    }

    /// Replace the content of a draft scenario.
    pub fn edit_scenario(
        &mut self,
        id: &ScenarioId,
        draft: ScenarioDraft,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        draft.validate()?;
        let scenario = self.scenario(id)?;
        scenario_transition(id, scenario.status, ScenarioAction::Edit)?;
        self.open_requirement(&scenario.requirement_id, "edit a scenario of")?;

        if let Some(scenario) = self.scenarios.get_mut(id) {
            scenario.title = draft.title.trim().to_string();
            scenario.scenario_type = draft.scenario_type;
            scenario.description = draft.description.trim().to_string();
            scenario.preconditions = draft.preconditions;
            scenario.expected_outcome = draft.expected_outcome;
        }
        self.record(now, EntityKind::Scenario, id, "edit", Transition::none(), None);
        Ok(())
    }

    pub fn approve_scenario(&mut self, id: &ScenarioId, now: DateTime<Utc>) -> CoreResult<()> {
        let scenario = self.scenario(id)?;
        let to = scenario_transition(id, scenario.status, ScenarioAction::Approve)?;
        self.open_requirement(&scenario.requirement_id, "approve a scenario of")?;

        if let Some(scenario) = self.scenarios.get_mut(id) {
            scenario.status = to;
        }
        self.record(
            now,
            EntityKind::Scenario,
            id,
            "approve",
            Transition::moved(ScenarioStatus::Draft, to),
            None,
        );
        Ok(())
    }
}
