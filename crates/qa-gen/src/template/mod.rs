//! Deterministic generation backend
//!
//! `TemplateBackend` answers every request locally: keyword heuristics for
//! analysis, scenarios and test cases, and minijinja templates for scripts.
//! It reports token usage as an estimate so budgets and dashboards behave
//! the same as with a model-backed implementation.

mod analysis;
mod scripts;

use crate::backend::{
    AnalysisRequest, GenerationBackend, Generated, RequestOptions, ScenarioRequest,
    ScriptRequest, TestCaseRequest,
};
use crate::error::{GenError, GenResult};
use async_trait::async_trait;
use qa_core::{AnalysisOutcome, ScenarioDraft, TestCaseDraft};
use scripts::ScriptTemplates;
use serde::Serialize;

/// Rough token count, four characters per token
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4).max(1)
}

fn check_budget(prompt: &str, options: &RequestOptions) -> GenResult<u64> {
    let estimated = estimate_tokens(prompt);
    if estimated > u64::from(options.token_limit) {
        return Err(GenError::TokenLimit {
            estimated,
            limit: options.token_limit,
        });
    }
    Ok(estimated)
}

fn output_tokens<T: Serialize>(output: &T) -> u64 {
    serde_json::to_string(output)
        .map(|json| estimate_tokens(&json))
        .unwrap_or(0)
}

/// Local backend built on heuristics and templates
pub struct TemplateBackend {
    scripts: ScriptTemplates,
}

impl TemplateBackend {
    pub fn new() -> GenResult<Self> {
        Ok(Self {
            scripts: ScriptTemplates::new()?,
        })
    }
}

#[async_trait]
impl GenerationBackend for TemplateBackend {
    fn name(&self) -> &str {
        "template"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> GenResult<Generated<AnalysisOutcome>> {
        let input = check_budget(&request.requirement.full_text(), &request.options)?;
        let outcome = analysis::analyze(&request.requirement);
        let tokens = input + output_tokens(&outcome);
        Ok(Generated::new(outcome, tokens))
    }

    async fn scenarios(
        &self,
        request: &ScenarioRequest,
    ) -> GenResult<Generated<Vec<ScenarioDraft>>> {
        let input = check_budget(&request.prompt, &request.options)?;
        let drafts = analysis::scenarios(&request.requirement);
        let tokens = input + output_tokens(&drafts);
        Ok(Generated::new(drafts, tokens))
    }

    async fn test_cases(
        &self,
        request: &TestCaseRequest,
    ) -> GenResult<Generated<Vec<TestCaseDraft>>> {
        let input = check_budget(&request.prompt, &request.options)?;
        let drafts = analysis::test_cases(&request.requirement, &request.scenario);
        let tokens = input + output_tokens(&drafts);
        Ok(Generated::new(drafts, tokens))
    }

    async fn script(&self, request: &ScriptRequest) -> GenResult<Generated<String>> {
        let input = check_budget(&request.prompt, &request.options)?;
        let code = self
            .scripts
            .render(&request.test_case, request.framework, request.language)?;
        let tokens = input + estimate_tokens(&code);
        Ok(Generated::new(code, tokens))
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
