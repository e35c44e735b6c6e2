//! qa-gen - Generation layer for the QA platform
//!
//! This crate turns requirements into test assets. A [`GenerationBackend`]
//! produces analyses, scenarios, test cases and automation code; the
//! [`Workflow`] runs each request against the [`qa_core::Ledger`] with
//! idempotency receipts, and the [`ScriptValidator`] checks generated code
//! before it is stored.

pub mod backend;
pub mod error;
pub mod prompt;
pub mod template;
pub mod validate;
pub mod workflow;

#[cfg(test)]
mod test_utils;

pub use backend::{
    AnalysisRequest, GenerationBackend, Generated, RequestOptions, ScenarioRequest, ScriptRequest,
    TestCaseRequest,
};
pub use error::{GenError, GenResult};
pub use prompt::PromptRenderer;
pub use template::{estimate_tokens, TemplateBackend};
pub use validate::{RuleInfo, RuleLevel, ScriptValidator, RULES};
pub use workflow::{GenerationOutcome, Workflow};
