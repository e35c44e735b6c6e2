//! Test scenarios derived from a requirement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{RequirementId, ScenarioId};
use crate::status_enum::define_status_enum;
use crate::version::Version;

define_status_enum! {
    /// Kind of situation a scenario validates
    pub enum ScenarioType {
        Happy => "happy",
        Negative => "negative",
        Edge => "edge",
        Boundary => "boundary",
        Authorization => "authorization",
        Validation => "validation",
    }
}

define_status_enum! {
    /// Scenario approval status, independent of the requirement's status
    pub enum ScenarioStatus {
        Draft => "draft",
        Approved => "approved",
    }
}

define_status_enum! {
    /// Whether a scenario came from the generator or a person
    pub enum Origin {
        Generated => "generated",
        Manual => "manual",
    }
}

/// A qualitative description of one situation to validate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestScenario {
    pub id: ScenarioId,
    pub requirement_id: RequirementId,
    /// Requirement version the scenario was derived from
    pub requirement_version: Version,
    pub title: String,
    #[serde(rename = "type")]
    pub scenario_type: ScenarioType,
    pub description: String,
    #[serde(default)]
    pub preconditions: Vec<String>,
    pub expected_outcome: String,
    pub status: ScenarioStatus,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
}

/// Scenario content, as produced by a generator or entered manually
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub scenario_type: ScenarioType,
    pub description: String,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub expected_outcome: String,
}

impl ScenarioDraft {
    pub fn validate(&self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::validation("scenario", "title is required"));
        }
        if self.description.trim().is_empty() {
            return Err(CoreError::validation(
                "scenario",
                "description is required",
            ));
        }
        Ok(())
    }
}
