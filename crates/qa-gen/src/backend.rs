//! Generation backend trait

use crate::error::GenResult;
use async_trait::async_trait;
use qa_core::{
    AnalysisOutcome, Framework, Language, Requirement, ScenarioDraft, TestCase, TestCaseDraft,
    TestScenario,
};

/// Backend output plus the tokens it consumed
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub output: T,
    pub tokens_used: u64,
}

impl<T> Generated<T> {
    pub fn new(output: T, tokens_used: u64) -> Self {
        Self {
            output,
            tokens_used,
        }
    }
}

/// Settings shared by every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub model_version: String,
    pub token_limit: u32,
}

/// Ask for the structured analysis of one requirement version
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub requirement: Requirement,
    pub options: RequestOptions,
}

/// Ask for the scenarios of a ready requirement
#[derive(Debug, Clone)]
pub struct ScenarioRequest {
    pub requirement: Requirement,
    pub prompt: String,
    pub options: RequestOptions,
}

/// Ask for the test cases of one scenario
#[derive(Debug, Clone)]
pub struct TestCaseRequest {
    pub requirement: Requirement,
    pub scenario: TestScenario,
    pub prompt: String,
    pub options: RequestOptions,
}

/// Ask for the automation code of one approved test case
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub test_case: TestCase,
    pub framework: Framework,
    pub language: Language,
    pub prompt: String,
    pub options: RequestOptions,
}

/// A source of generated test assets.
///
/// Implementations must be Send + Sync; the workflow issues per-scenario
/// requests concurrently.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend identifier for logging and error messages
    fn name(&self) -> &str;

    /// Break a requirement down and report issues in its text
    async fn analyze(&self, request: &AnalysisRequest) -> GenResult<Generated<AnalysisOutcome>>;

    /// Propose scenarios for a requirement
    async fn scenarios(&self, request: &ScenarioRequest)
        -> GenResult<Generated<Vec<ScenarioDraft>>>;

    /// Propose test cases for one scenario
    async fn test_cases(
        &self,
        request: &TestCaseRequest,
    ) -> GenResult<Generated<Vec<TestCaseDraft>>>;

    /// Write automation code for one test case
    async fn script(&self, request: &ScriptRequest) -> GenResult<Generated<String>>;
}
