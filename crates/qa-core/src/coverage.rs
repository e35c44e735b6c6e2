//! Requirement coverage derived from scenarios and approved test cases.

use serde::Serialize;

use crate::ids::ScenarioId;
use crate::requirement::CoverageStatus;
use crate::test_case::{TestCase, TestCaseStatus};

/// Coverage of one requirement, computed from the current version of each
/// of its test cases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub scenarios: usize,
    /// Scenarios with at least one approved test case
    pub covered_scenarios: usize,
    /// Current test cases that are not rejected
    pub linked_test_cases: usize,
    pub status: CoverageStatus,
}

impl Coverage {
    /// Compute coverage for `scenarios` given the current test cases under
    /// the same requirement.
    pub fn compute<'a>(
        scenarios: impl IntoIterator<Item = &'a ScenarioId>,
        cases: &[&TestCase],
    ) -> Self {
        let mut coverage = Coverage::default();
        for scenario in scenarios {
            coverage.scenarios += 1;
            let covered = cases.iter().any(|c| {
                &c.scenario_id == scenario && c.status == TestCaseStatus::Approved
            });
            if covered {
                coverage.covered_scenarios += 1;
            }
        }
        coverage.linked_test_cases = cases
            .iter()
            .filter(|c| c.status != TestCaseStatus::Rejected)
            .count();
        coverage.status = status_for(coverage.scenarios, coverage.covered_scenarios);
        coverage
    }

    /// Covered scenarios as a percentage, `None` without scenarios
    pub fn percent(&self) -> Option<f64> {
        (self.scenarios > 0)
            .then(|| self.covered_scenarios as f64 * 100.0 / self.scenarios as f64)
    }
}

/// Zero scenarios counts as not generated
pub fn status_for(scenarios: usize, covered: usize) -> CoverageStatus {
    if covered == 0 {
        CoverageStatus::NotGenerated
    } else if covered < scenarios {
        CoverageStatus::Partial
    } else {
        CoverageStatus::Complete
    }
}
