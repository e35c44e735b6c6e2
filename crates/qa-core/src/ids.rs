//! Entity identifiers and the sequences that allocate them.

use crate::newtype_string::define_newtype_string;
use serde::{Deserialize, Serialize};

define_newtype_string! {
    /// Identifier of a [`Project`](crate::project::Project), e.g. `PROJ-001`.
    pub struct ProjectId;
}

define_newtype_string! {
    /// Identifier of a [`Requirement`](crate::requirement::Requirement), e.g. `REQ-001`.
    pub struct RequirementId;
}

define_newtype_string! {
    /// Identifier of a [`TestScenario`](crate::scenario::TestScenario), e.g. `SCN-001`.
    pub struct ScenarioId;
}

define_newtype_string! {
    /// Identifier of a [`TestCase`](crate::test_case::TestCase), e.g. `TC-001`.
    pub struct TestCaseId;
}

define_newtype_string! {
    /// Identifier of an [`AutomationScript`](crate::script::AutomationScript), e.g. `SCR-001`.
    pub struct ScriptId;
}

define_newtype_string! {
    /// Identifier of an [`Execution`](crate::execution::Execution), e.g. `EXE-001`.
    pub struct ExecutionId;
}

define_newtype_string! {
    /// Identifier of an [`ExecutionResult`](crate::execution::ExecutionResult), e.g. `RES-001`.
    pub struct ResultId;
}

define_newtype_string! {
    /// Client-supplied idempotency key for generation requests.
    ///
    /// Retrying a request with the same token returns the recorded outcome
    /// instead of generating a second set of entities.
    pub struct RequestToken;
}

/// Per-prefix counters used to allocate identifiers.
///
/// Counters only move forward, so an identifier is never handed out twice
/// even after the entity it named has been archived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSequences {
    pub project: u32,
    pub requirement: u32,
    pub scenario: u32,
    pub test_case: u32,
    pub script: u32,
    pub execution: u32,
    pub result: u32,
}

fn format_id(prefix: &str, n: u32) -> String {
    format!("{prefix}-{n:03}")
}

impl IdSequences {
    pub fn next_project(&mut self) -> ProjectId {
        self.project += 1;
        ProjectId::new(format_id("PROJ", self.project))
    }

    pub fn next_requirement(&mut self) -> RequirementId {
        self.requirement += 1;
        RequirementId::new(format_id("REQ", self.requirement))
    }

    pub fn next_scenario(&mut self) -> ScenarioId {
        self.scenario += 1;
        ScenarioId::new(format_id("SCN", self.scenario))
    }

    pub fn next_test_case(&mut self) -> TestCaseId {
        self.test_case += 1;
        TestCaseId::new(format_id("TC", self.test_case))
    }

    pub fn next_script(&mut self) -> ScriptId {
        self.script += 1;
        ScriptId::new(format_id("SCR", self.script))
    }

    pub fn next_execution(&mut self) -> ExecutionId {
        self.execution += 1;
        ExecutionId::new(format_id("EXE", self.execution))
    }

    pub fn next_result(&mut self) -> ResultId {
        self.result += 1;
        ResultId::new(format_id("RES", self.result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_are_zero_padded_and_monotonic() {
        let mut seq = IdSequences::default();
        assert_eq!(seq.next_requirement(), "REQ-001");
        assert_eq!(seq.next_requirement(), "REQ-002");
        assert_eq!(seq.next_test_case(), "TC-001");
        assert_eq!(seq.requirement, 2);
    }

    #[test]
    fn test_id_rejects_empty() {
        assert!(RequirementId::try_new("").is_none());
        assert!(RequirementId::try_new("   ").is_none());
        assert!("".parse::<ProjectId>().is_err());
    }

    #[test]
    fn test_id_deserialize_rejects_empty() {
        let result: Result<ScenarioId, _> = serde_json::from_str(r#""""#);
        assert!(result.is_err());
        let id: ScenarioId = serde_json::from_str(r#""SCN-004""#).unwrap();
        assert_eq!(id, "SCN-004");
    }

    #[test]
    fn test_id_borrow_lookup() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert(TestCaseId::new("TC-001"), 1);
        assert_eq!(map.get("TC-001"), Some(&1));
    }
}
