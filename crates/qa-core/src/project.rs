//! Projects: the root of the traceability chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::ProjectId;
use crate::script::{Framework, Language};
use crate::status_enum::define_status_enum;

define_status_enum! {
    /// Lifecycle of a project
    pub enum ProjectStatus {
        Active => "active",
        /// Terminal; children stay readable for audits
        Archived => "archived",
    }
}

define_status_enum! {
    /// Role of a project member
    pub enum MemberRole {
        Admin => "admin",
        Contributor => "contributor",
        Viewer => "viewer",
    }
}

/// A person with access to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub email: String,
    pub role: MemberRole,
}

/// Prompt templates used when asking the generation backend for content.
///
/// Empty templates fall back to the backend's built-in prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplates {
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub test_case: String,
    #[serde(default)]
    pub script: String,
}

/// Per-project generation settings; omitted fields take their defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Model identifier passed through to the backend
    pub model_version: String,

    /// Maximum tokens a single generation request may consume
    pub token_limit: u32,

    pub default_framework: Framework,

    pub default_language: Language,

    pub prompts: PromptTemplates,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_version: "GPT-4".to_string(),
            token_limit: 8000,
            default_framework: Framework::Playwright,
            default_language: Language::TypeScript,
            prompts: PromptTemplates::default(),
        }
    }
}

/// A product release under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub product: String,
    pub release: String,
    pub owner: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub settings: GenerationSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }
}

/// Input for creating a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub release: String,
    pub owner: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub settings: Option<GenerationSettings>,
}

impl NewProject {
    /// Required-field and shape checks
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("project", "project name is required"));
        }
        if self.owner.trim().is_empty() {
            return Err(CoreError::validation("project", "project owner is required"));
        }
        for member in &self.members {
            validate_email(&member.email)?;
        }
        if let Some(settings) = &self.settings {
            settings.validate()?;
        }
        Ok(())
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> CoreResult<()> {
        if self.token_limit == 0 {
            return Err(CoreError::validation(
                "project",
                "token limit must be greater than zero",
            ));
        }
        if !self.default_framework.supports(self.default_language) {
            return Err(CoreError::validation(
                "project",
                format!(
                    "{} does not support {}",
                    self.default_framework, self.default_language
                ),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_email(email: &str) -> CoreResult<()> {
    let trimmed = email.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CoreError::validation(
            "member",
            format!("'{email}' is not a valid email address"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_project() -> NewProject {
        NewProject {
            name: "E-Commerce Platform".to_string(),
            owner: "john.doe@company.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_project_requires_name_and_owner() {
        assert!(new_project().validate().is_ok());

        let mut missing_name = new_project();
        missing_name.name = "  ".to_string();
        assert!(missing_name.validate().is_err());

        let mut missing_owner = new_project();
        missing_owner.owner.clear();
        assert!(missing_owner.validate().is_err());
    }

    #[test]
    fn test_member_email_validation() {
        let mut project = new_project();
        project.members.push(Member {
            email: "not-an-email".to_string(),
            role: MemberRole::Contributor,
        });
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_settings_reject_unsupported_pair() {
        let settings = GenerationSettings {
            default_framework: Framework::Cypress,
            default_language: Language::Python,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_member_role_parse() {
        assert_eq!("Admin".parse::<MemberRole>().unwrap(), MemberRole::Admin);
        assert!("owner".parse::<MemberRole>().is_err());
    }
}
