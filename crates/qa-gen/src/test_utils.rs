//! Shared fixtures for qa-gen unit tests.

use chrono::Utc;
use qa_core::{
    CoverageStatus, Origin, Priority, ProjectId, Requirement, RequirementId, RequirementStatus, ScenarioId,
    ScenarioStatus, ScenarioType, TestCase, TestCaseId, TestCaseStatus, TestScenario, TestStep,
    TestType, Version,
};

pub(crate) fn checkout_requirement() -> Requirement {
    Requirement {
        id: RequirementId::new("REQ-001"),
        project_id: ProjectId::new("PROJ-001"),
        title: "User Checkout Process".to_string(),
        description: "Users must be logged in to check out. \
                      The user selects a payment method and enters credit card details. \
                      All items must be in stock and the payment method must be valid. \
                      Checkout must complete within 15 minutes. \
                      The Payment Service API confirms the charge."
            .to_string(),
        acceptance_criteria: vec![
            "Order is created".to_string(),
            "Confirmation email is sent".to_string(),
        ],
        release: "R2.1".to_string(),
        owner: "john.doe@company.com".to_string(),
        status: RequirementStatus::Ready,
        version: Version::INITIAL,
        analysis: None,
        issues: Vec::new(),
        clarifications: Vec::new(),
        linked_test_cases: 0,
        coverage_status: CoverageStatus::NotGenerated,
        created_at: Utc::now(),
        last_modified: Utc::now(),
    }
}

pub(crate) fn happy_scenario() -> TestScenario {
    TestScenario {
        id: ScenarioId::new("SCN-001"),
        requirement_id: RequirementId::new("REQ-001"),
        requirement_version: Version::INITIAL,
        title: "Successful checkout with credit card".to_string(),
        scenario_type: ScenarioType::Happy,
        description: "User completes checkout using a valid credit card".to_string(),
        preconditions: vec![
            "User is logged in".to_string(),
            "Cart has items".to_string(),
        ],
        expected_outcome: "Order is created, payment is processed".to_string(),
        status: ScenarioStatus::Draft,
        origin: Origin::Generated,
        created_at: Utc::now(),
    }
}

fn step(n: u32, action: &str, take_snapshot: bool) -> TestStep {
    TestStep {
        step_number: n,
        action: action.to_string(),
        expected_result: String::new(),
        take_snapshot,
    }
}

pub(crate) fn checkout_case() -> TestCase {
    TestCase {
        id: TestCaseId::new("TC-001"),
        scenario_id: ScenarioId::new("SCN-001"),
        requirement_id: RequirementId::new("REQ-001"),
        title: "Successful checkout with valid credit card".to_string(),
        priority: Priority::High,
        test_type: TestType::Ui,
        preconditions: vec!["User is logged in".to_string()],
        steps: vec![
            step(1, "Navigate to shopping cart", false),
            step(2, "Click \"Proceed to Checkout\" button", false),
            step(3, "Enter credit card details", false),
            step(4, "Click \"Complete Purchase\" button", true),
        ],
        expected_results: vec!["Order confirmation displayed".to_string()],
        postconditions: vec![],
        status: TestCaseStatus::Approved,
        version: Version::INITIAL,
        tags: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
