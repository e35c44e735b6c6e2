//! Prompt rendering with minijinja
//!
//! Each project may override the built-in prompts through its generation
//! settings. Templates see the entities they are about as serialized
//! values (`requirement`, `scenario`, `case`) plus `framework` and
//! `language` for scripts.

use crate::error::GenResult;
use minijinja::{context, Environment};
use qa_core::{Framework, Language, PromptTemplates, Requirement, TestCase, TestScenario};

const DEFAULT_SCENARIO_PROMPT: &str = "\
Generate test scenarios for requirement {{ requirement.id }} ({{ requirement.version }}): {{ requirement.title }}

{{ requirement.description }}
{% if requirement.acceptance_criteria %}
Acceptance criteria:
{% for criterion in requirement.acceptance_criteria %}- {{ criterion }}
{% endfor %}{% endif %}{% for c in requirement.clarifications %}Clarification: {{ c }}
{% endfor %}
Cover the happy path first, then negative, edge, boundary, authorization and validation situations where they apply.";

const DEFAULT_TEST_CASE_PROMPT: &str = "\
Write test cases for scenario {{ scenario.id }} ({{ scenario.type }}): {{ scenario.title }}
Requirement {{ requirement.id }}: {{ requirement.title }}

{{ scenario.description }}
{% if scenario.preconditions %}Preconditions: {{ scenario.preconditions | join(\", \") }}
{% endif %}Expected outcome: {{ scenario.expected_outcome }}

Give numbered steps with one user action each and mark the steps that need a screenshot.";

const DEFAULT_SCRIPT_PROMPT: &str = "\
Write a {{ framework }} test in {{ language }} for test case {{ case.id }} ({{ case.version }}): {{ case.title }}
{% for step in case.steps %}{{ step.step_number }}. {{ step.action }}{% if step.take_snapshot %} [screenshot]{% endif %}
{% endfor %}Expected: {{ case.expected_results | join(\"; \") }}

Assert every expected result. Do not hardcode credentials or use fixed waits.";

/// Renders the prompts sent to a generation backend
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    /// Build a renderer; blank project templates fall back to the built-in ones.
    pub fn new(templates: &PromptTemplates) -> GenResult<Self> {
        let mut env = Environment::new();
        env.add_template_owned(
            "scenario",
            pick(&templates.scenario, DEFAULT_SCENARIO_PROMPT),
        )?;
        env.add_template_owned(
            "test_case",
            pick(&templates.test_case, DEFAULT_TEST_CASE_PROMPT),
        )?;
        env.add_template_owned("script", pick(&templates.script, DEFAULT_SCRIPT_PROMPT))?;
        Ok(Self { env })
    }

    pub fn scenario(&self, requirement: &Requirement) -> GenResult<String> {
        let template = self.env.get_template("scenario")?;
        Ok(template.render(context! { requirement => requirement })?)
    }

    pub fn test_case(&self, requirement: &Requirement, scenario: &TestScenario) -> GenResult<String> {
        let template = self.env.get_template("test_case")?;
        Ok(template.render(context! {
            requirement => requirement,
            scenario => scenario,
        })?)
    }

    pub fn script(
        &self,
        case: &TestCase,
        framework: Framework,
        language: Language,
    ) -> GenResult<String> {
        let template = self.env.get_template("script")?;
        Ok(template.render(context! {
            case => case,
            framework => framework.as_str(),
            language => language.as_str(),
        })?)
    }
}

fn pick(custom: &str, default: &str) -> String {
    if custom.trim().is_empty() {
        default.to_string()
    } else {
        custom.to_string()
    }
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
