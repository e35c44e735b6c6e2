//! Generated automation scripts and their validation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{RequirementId, ScriptId, TestCaseId};
use crate::status_enum::define_status_enum;
use crate::version::Version;

define_status_enum! {
    /// Browser automation framework a script targets
    pub enum Framework {
        Playwright => "playwright",
        Cypress => "cypress",
    }
}

define_status_enum! {
    pub enum Language {
        TypeScript => "typescript",
        JavaScript => "javascript",
        Python => "python",
    }
}

impl Framework {
    /// Whether scripts for this framework can be written in `language`
    pub fn supports(self, language: Language) -> bool {
        match self {
            Framework::Playwright => true,
            Framework::Cypress => matches!(language, Language::TypeScript | Language::JavaScript),
        }
    }
}

impl Language {
    /// File extension for generated scripts
    pub fn extension(self) -> &'static str {
        match self {
            Language::TypeScript => "spec.ts",
            Language::JavaScript => "spec.js",
            Language::Python => "py",
        }
    }
}

define_status_enum! {
    /// Script review status
    pub enum ScriptStatus {
        Draft => "draft",
        ValidationFailed => "validation-failed",
        Approved => "approved",
        Rejected => "rejected",
    }
}

define_status_enum! {
    /// Outcome of one validation rule
    pub enum ValidationStatus {
        Passed => "passed",
        Failed => "failed",
        /// Does not block approval but is surfaced to the reviewer
        Warning => "warning",
    }
}

/// Result of running one validation rule against generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule: String,
    pub status: ValidationStatus,
    pub message: String,
}

impl ValidationResult {
    pub fn passed(rule: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            status: ValidationStatus::Passed,
            message: message.into(),
        }
    }

    pub fn failed(rule: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            status: ValidationStatus::Failed,
            message: message.into(),
        }
    }

    pub fn warning(rule: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            status: ValidationStatus::Warning,
            message: message.into(),
        }
    }
}

/// Status a script lands in after validation
pub fn status_after_validation(results: &[ValidationResult]) -> ScriptStatus {
    if results
        .iter()
        .any(|r| r.status == ValidationStatus::Failed)
    {
        ScriptStatus::ValidationFailed
    } else {
        ScriptStatus::Draft
    }
}

/// Generated executable code implementing a test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationScript {
    pub id: ScriptId,
    pub test_case_id: TestCaseId,
    /// Test case version the code was generated from
    pub test_case_version: Version,
    pub requirement_id: RequirementId,
    pub framework: Framework,
    pub language: Language,
    pub code: String,
    pub status: ScriptStatus,
    pub version: Version,
    pub validation_results: Vec<ValidationResult>,
    pub created_at: DateTime<Utc>,
    /// Set once, on the transition into approved
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

impl AutomationScript {
    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validation_results
            .iter()
            .filter(|r| r.status == ValidationStatus::Failed)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validation_results
            .iter()
            .filter(|r| r.status == ValidationStatus::Warning)
    }
}

/// Generated or hand-fixed code plus the validation results computed for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDraft {
    pub framework: Framework,
    pub language: Language,
    pub code: String,
    pub validation_results: Vec<ValidationResult>,
}

impl ScriptDraft {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.framework.supports(self.language) {
            return Err(CoreError::validation(
                "script",
                format!("{} does not support {}", self.framework, self.language),
            ));
        }
        if self.code.trim().is_empty() {
            return Err(CoreError::validation("script", "code is empty"));
        }
        Ok(())
    }
}
