//! Generation workflow
//!
//! A [`Workflow`] drives one generation request end to end: it registers
//! the request as a receipt, checks the lifecycle preconditions, calls the
//! backend, validates what came back, and writes it into the [`Ledger`].
//! A retried request with a completed receipt is answered from the
//! receipt without calling the backend.

use crate::backend::{
    AnalysisRequest, GenerationBackend, RequestOptions, ScenarioRequest, ScriptRequest,
    TestCaseRequest,
};
use crate::error::GenError;
use crate::prompt::PromptRenderer;
use crate::validate::ScriptValidator;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use qa_core::lifecycle::{precondition, requirement_transition, RequirementAction};
use qa_core::{
    CoreError, CoreResult, Framework, Language, Ledger, Operation, Project, ProjectStatus,
    ReceiptCheck, RequestKey, RequestToken, Requirement, RequirementId, ScriptDraft,
    TestCase, TestCaseId, TestCaseStatus, Version,
};

/// What a generation request produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Token the request was tracked under; generated when none was given
    pub token: RequestToken,
    /// Ids of the entities written (or updated) by the request
    pub produced: Vec<String>,
    pub tokens_used: u64,
    /// True when the outcome came from an earlier completed receipt
    pub replayed: bool,
}

/// Runs generation requests against a ledger
pub struct Workflow<'a> {
    ledger: &'a mut Ledger,
    backend: &'a dyn GenerationBackend,
    validator: &'a ScriptValidator,
}

impl<'a> Workflow<'a> {
    pub fn new(
        ledger: &'a mut Ledger,
        backend: &'a dyn GenerationBackend,
        validator: &'a ScriptValidator,
    ) -> Self {
        Self {
            ledger,
            backend,
            validator,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        self.ledger
    }

    /// Analyze the current version of a draft requirement
    pub async fn analyze(
        &mut self,
        requirement_id: &RequirementId,
        expected: Option<Version>,
        token: Option<RequestToken>,
        now: DateTime<Utc>,
    ) -> CoreResult<GenerationOutcome> {
        let requirement = self.ledger.requirement(requirement_id)?.clone();
        let key = request_key(
            token,
            Operation::AnalyzeRequirement,
            &requirement,
            &requirement.version.to_string(),
        );
        if let Some(replay) = self.begin(&key, now)? {
            return Ok(replay);
        }
        let mut tokens = 0;
        let result = self
            .run_analysis(&requirement, expected, &mut tokens, now)
            .await;
        self.finish(&key, result, tokens, now)
    }

    async fn run_analysis(
        &mut self,
        requirement: &Requirement,
        expected: Option<Version>,
        tokens: &mut u64,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<String>> {
        let project = self.active_project(requirement)?;
        requirement_transition(
            &requirement.id,
            requirement.status,
            RequirementAction::Analyze {
                needs_clarification: false,
            },
        )?;
        if let Some(expected) = expected.filter(|v| *v != requirement.version) {
            return Err(CoreError::Conflict {
                entity: "requirement".to_string(),
                id: requirement.id.to_string(),
                message: format!(
                    "expected {expected}, current version is {}",
                    requirement.version
                ),
            });
        }

        let request = AnalysisRequest {
            requirement: requirement.clone(),
            options: options(&project),
        };
        let generated = self
            .backend
            .analyze(&request)
            .await
            .map_err(|e| e.into_dependency_failure(Operation::AnalyzeRequirement.as_str()))?;
        *tokens = generated.tokens_used;

        let status = self.ledger.record_analysis(
            &requirement.id,
            Some(requirement.version),
            generated.output,
            now,
        )?;
        log::debug!("analyzed {} -> {status}", requirement.id);
        Ok(vec![requirement.id.to_string()])
    }

    /// Generate the scenarios of a ready requirement
    pub async fn generate_scenarios(
        &mut self,
        requirement_id: &RequirementId,
        token: Option<RequestToken>,
        now: DateTime<Utc>,
    ) -> CoreResult<GenerationOutcome> {
        let requirement = self.ledger.requirement(requirement_id)?.clone();
        let key = request_key(
            token,
            Operation::GenerateScenarios,
            &requirement,
            &requirement.version.to_string(),
        );
        if let Some(replay) = self.begin(&key, now)? {
            return Ok(replay);
        }
        let mut tokens = 0;
        let result = self.run_scenarios(&requirement, &mut tokens, now).await;
        self.finish(&key, result, tokens, now)
    }

    async fn run_scenarios(
        &mut self,
        requirement: &Requirement,
        tokens: &mut u64,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<String>> {
        let project = self.active_project(requirement)?;
        requirement_transition(
            &requirement.id,
            requirement.status,
            RequirementAction::GenerateScenarios,
        )?;
        let prompt = renderer(&project)?
            .scenario(requirement)
            .map_err(prompt_error)?;

        let request = ScenarioRequest {
            requirement: requirement.clone(),
            prompt,
            options: options(&project),
        };
        let generated = self
            .backend
            .scenarios(&request)
            .await
            .map_err(|e| e.into_dependency_failure(Operation::GenerateScenarios.as_str()))?;
        *tokens = generated.tokens_used;

        let ids = self
            .ledger
            .add_generated_scenarios(&requirement.id, generated.output, now)?;
        Ok(ids.into_iter().map(|id| id.into_inner()).collect())
    }

    /// Generate test cases for every scenario of the requirement that has
    /// none yet. Scenarios are sent to the backend concurrently.
    pub async fn generate_test_cases(
        &mut self,
        requirement_id: &RequirementId,
        token: Option<RequestToken>,
        now: DateTime<Utc>,
    ) -> CoreResult<GenerationOutcome> {
        let requirement = self.ledger.requirement(requirement_id)?.clone();
        let key = request_key(
            token,
            Operation::GenerateTestCases,
            &requirement,
            &requirement.version.to_string(),
        );
        if let Some(replay) = self.begin(&key, now)? {
            return Ok(replay);
        }
        let mut tokens = 0;
        let result = self.run_test_cases(&requirement, &mut tokens, now).await;
        self.finish(&key, result, tokens, now)
    }

    async fn run_test_cases(
        &mut self,
        requirement: &Requirement,
        tokens: &mut u64,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<String>> {
        let project = self.active_project(requirement)?;
        requirement_transition(
            &requirement.id,
            requirement.status,
            RequirementAction::GenerateTestCases,
        )?;
        let renderer = renderer(&project)?;
        let ledger = &*self.ledger;
        let mut requests = Vec::new();
        for scenario in ledger
            .current_scenarios_for(&requirement.id)
            .filter(|s| ledger.live_cases_for(&s.id) == 0)
        {
            requests.push(TestCaseRequest {
                requirement: requirement.clone(),
                scenario: scenario.clone(),
                prompt: renderer
                    .test_case(requirement, scenario)
                    .map_err(prompt_error)?,
                options: options(&project),
            });
        }
        if requests.is_empty() {
            return Err(CoreError::Validation {
                entity: "test case".to_string(),
                message: format!("every scenario of '{}' already has test cases", requirement.id),
            });
        }
        log::debug!(
            "requesting test cases for {} scenario(s) of {}",
            requests.len(),
            requirement.id
        );

        let backend = self.backend;
        let generated = try_join_all(requests.iter().map(|r| backend.test_cases(r)))
            .await
            .map_err(|e| e.into_dependency_failure(Operation::GenerateTestCases.as_str()))?;
        *tokens = generated.iter().map(|g| g.tokens_used).sum();

        let batch = requests
            .into_iter()
            .zip(generated)
            .map(|(request, generated)| (request.scenario.id, generated.output))
            .collect();
        let ids = self
            .ledger
            .add_generated_test_cases(&requirement.id, batch, now)?;
        Ok(ids.into_iter().map(|id| id.into_inner()).collect())
    }

    /// Generate and validate automation code for an approved test case.
    /// Framework and language default to the project's settings.
    pub async fn generate_script(
        &mut self,
        test_case_id: &TestCaseId,
        framework: Option<Framework>,
        language: Option<Language>,
        token: Option<RequestToken>,
        now: DateTime<Utc>,
    ) -> CoreResult<GenerationOutcome> {
        let case = self.ledger.test_case(test_case_id)?.clone();
        let requirement = self.ledger.requirement(&case.requirement_id)?.clone();
        let settings = &self.ledger.project(&requirement.project_id)?.settings;
        let framework = framework.unwrap_or(settings.default_framework);
        let language = language.unwrap_or(settings.default_language);

        let key = RequestKey::new(
            token.unwrap_or_else(new_token),
            Operation::GenerateScript,
            requirement.project_id.clone(),
            test_case_id.as_str(),
            &format!("{}\u{1f}{framework}\u{1f}{language}", case.version),
        );
        if let Some(replay) = self.begin(&key, now)? {
            return Ok(replay);
        }
        let mut tokens = 0;
        let result = self
            .run_script(&requirement, case, framework, language, &mut tokens, now)
            .await;
        self.finish(&key, result, tokens, now)
    }

    async fn run_script(
        &mut self,
        requirement: &Requirement,
        case: TestCase,
        framework: Framework,
        language: Language,
        tokens: &mut u64,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<String>> {
        let project = self.active_project(requirement)?;
        if case.status != TestCaseStatus::Approved {
            return Err(precondition(
                "test case",
                &case.id,
                "generate a script for",
                case.status,
                &[TestCaseStatus::Approved],
            ));
        }
        if !framework.supports(language) {
            return Err(CoreError::Validation {
                entity: "script".to_string(),
                message: format!("{framework} does not support {language}"),
            });
        }
        let prompt = renderer(&project)?
            .script(&case, framework, language)
            .map_err(prompt_error)?;

        let request = ScriptRequest {
            test_case: case,
            framework,
            language,
            prompt,
            options: options(&project),
        };
        let generated = self
            .backend
            .script(&request)
            .await
            .map_err(|e| e.into_dependency_failure(Operation::GenerateScript.as_str()))?;
        *tokens = generated.tokens_used;

        let validation_results =
            self.validator
                .validate(&generated.output, framework, language, &request.test_case);
        let draft = ScriptDraft {
            framework,
            language,
            code: generated.output,
            validation_results,
        };
        let id = self.ledger.add_script(&request.test_case.id, draft, now)?;
        Ok(vec![id.into_inner()])
    }

    /// Register the request; a completed receipt is turned into a replayed outcome.
    fn begin(&mut self, key: &RequestKey, now: DateTime<Utc>) -> CoreResult<Option<GenerationOutcome>> {
        match self.ledger.begin_request(key, now)? {
            ReceiptCheck::Proceed => Ok(None),
            ReceiptCheck::Replay(receipt) => Ok(Some(GenerationOutcome {
                token: receipt.token,
                produced: receipt.produced,
                tokens_used: receipt.tokens_used,
                replayed: true,
            })),
        }
    }

    /// Close the receipt with the result of the attempt
    fn finish(
        &mut self,
        key: &RequestKey,
        result: CoreResult<Vec<String>>,
        tokens_used: u64,
        now: DateTime<Utc>,
    ) -> CoreResult<GenerationOutcome> {
        match result {
            Ok(produced) => {
                self.ledger
                    .complete_request(&key.token, produced.clone(), tokens_used, now)?;
                log::debug!(
                    "{} {} produced {} entities ({tokens_used} tokens)",
                    key.operation,
                    key.target,
                    produced.len()
                );
                Ok(GenerationOutcome {
                    token: key.token.clone(),
                    produced,
                    tokens_used,
                    replayed: false,
                })
            }
            Err(err) => {
                log::debug!("{} {} failed: {err}", key.operation, key.target);
                self.ledger
                    .fail_request(&key.token, &err.to_string(), tokens_used, now)?;
                Err(err)
            }
        }
    }

    fn active_project(&self, requirement: &Requirement) -> CoreResult<Project> {
        let project = self.ledger.project(&requirement.project_id)?;
        if project.status != ProjectStatus::Active {
            return Err(precondition(
                "project",
                &project.id,
                "generate in",
                project.status,
                &[ProjectStatus::Active],
            ));
        }
        Ok(project.clone())
    }
}

fn new_token() -> RequestToken {
    RequestToken::new(uuid::Uuid::new_v4().to_string())
}

fn request_key(
    token: Option<RequestToken>,
    operation: Operation,
    requirement: &Requirement,
    params: &str,
) -> RequestKey {
    RequestKey::new(
        token.unwrap_or_else(new_token),
        operation,
        requirement.project_id.clone(),
        requirement.id.as_str(),
        params,
    )
}

fn options(project: &Project) -> RequestOptions {
    RequestOptions {
        model_version: project.settings.model_version.clone(),
        token_limit: project.settings.token_limit,
    }
}

fn renderer(project: &Project) -> CoreResult<PromptRenderer> {
    PromptRenderer::new(&project.settings.prompts).map_err(prompt_error)
}

fn prompt_error(err: GenError) -> CoreError {
    CoreError::Validation {
        entity: "prompt template".to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
#[path = "workflow_test.rs"]
mod tests;
