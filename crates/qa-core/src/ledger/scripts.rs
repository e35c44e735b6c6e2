use chrono::{DateTime, Utc};

use super::{check_expected, Ledger, Transition};
use crate::audit::EntityKind;
use crate::error::{CoreError, CoreResult};
use crate::history::VersionHistory;
use crate::ids::{ScriptId, TestCaseId};
use crate::lifecycle::{precondition, script_transition, ScriptAction};
use crate::script::{
    status_after_validation, AutomationScript, ScriptDraft, ScriptStatus, ValidationResult,
    ValidationStatus,
};
use crate::test_case::TestCaseStatus;
use crate::version::Version;

impl Ledger {
    /// Store generated code for an approved test case.
    ///
    /// There is one script per test case and framework: generating again
    /// pushes a new version of the existing script instead of creating a
    /// second one.
    pub fn add_script(
        &mut self,
        test_case_id: &TestCaseId,
        draft: ScriptDraft,
        now: DateTime<Utc>,
    ) -> CoreResult<ScriptId> {
        draft.validate()?;
        let case = self.test_case(test_case_id)?;
        if case.status != TestCaseStatus::Approved {
            return Err(precondition(
                "test case",
                test_case_id,
                "generate a script for",
                case.status,
                &[TestCaseStatus::Approved],
            ));
        }
        self.open_requirement(&case.requirement_id, "generate a script for")?;
        let case_version = case.version;
        let requirement_id = case.requirement_id.clone();

        let existing = self
            .scripts_for(test_case_id)
            .find(|s| s.framework == draft.framework)
            .map(|s| s.id.clone());
        if let Some(id) = existing {
            self.push_script_version(&id, draft, Some(case_version), "regenerate", now)?;
            return Ok(id);
        }

        let id = self.sequences.next_script();
        let status = status_after_validation(&draft.validation_results);
        log_warnings(&id, &draft.validation_results);
        let script = AutomationScript {
            id: id.clone(),
            test_case_id: test_case_id.clone(),
            test_case_version: case_version,
            requirement_id,
            framework: draft.framework,
            language: draft.language,
            code: draft.code,
            status,
            version: Version::INITIAL,
            validation_results: draft.validation_results,
            created_at: now,
            approved_at: None,
        };
        self.scripts.insert(id.clone(), VersionHistory::new(script));
        self.record(
            now,
            EntityKind::Script,
            &id,
            "generate",
            Transition::created(status),
            Some(Version::INITIAL),
        );
        Ok(id)
    }

    /// Push a manually fixed version of a script; `draft` carries the code
    /// and its fresh validation results.
    pub fn revise_script(
        &mut self,
        id: &ScriptId,
        expected: Option<Version>,
        draft: ScriptDraft,
        now: DateTime<Utc>,
    ) -> CoreResult<Version> {
        draft.validate()?;
        let current = self.script(id)?;
        check_expected("script", id, current.version, expected)?;
        if draft.framework != current.framework {
            return Err(CoreError::validation(
                "script",
                format!(
                    "cannot change framework of '{id}' from {} to {}",
                    current.framework, draft.framework
                ),
            ));
        }
        self.open_requirement(&current.requirement_id, "revise a script of")?;
        self.push_script_version(id, draft, None, "revise", now)
    }

    fn push_script_version(
        &mut self,
        id: &ScriptId,
        draft: ScriptDraft,
        test_case_version: Option<Version>,
        action: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Version> {
        let current = self.script(id)?;
        let from = current.status;
        let status = status_after_validation(&draft.validation_results);
        log_warnings(id, &draft.validation_results);
        let next = AutomationScript {
            id: id.clone(),
            test_case_id: current.test_case_id.clone(),
            test_case_version: test_case_version.unwrap_or(current.test_case_version),
            requirement_id: current.requirement_id.clone(),
            framework: draft.framework,
            language: draft.language,
            code: draft.code,
            status,
            version: current.version.next(),
            validation_results: draft.validation_results,
            created_at: now,
            approved_at: None,
        };
        let version = next.version;
        if let Some(history) = self.scripts.get_mut(id) {
            history.push(next)?;
        }
        self.record(
            now,
            EntityKind::Script,
            id,
            action,
            Transition::moved(from, status),
            Some(version),
        );
        Ok(version)
    }

    /// Current version of a script
    pub fn script(&self, id: &ScriptId) -> CoreResult<&AutomationScript> {
        self.script_history(id).map(VersionHistory::current)
    }

    pub fn script_history(&self, id: &ScriptId) -> CoreResult<&VersionHistory<AutomationScript>> {
        self.scripts
            .get(id)
            .ok_or_else(|| CoreError::not_found("script", id))
    }

    /// Current versions of every script
    pub fn scripts(&self) -> impl Iterator<Item = &AutomationScript> {
        self.scripts.values().map(VersionHistory::current)
    }

    /// Current versions of the scripts for one test case
    pub fn scripts_for<'a>(
        &'a self,
        test_case_id: &'a TestCaseId,
    ) -> impl Iterator<Item = &'a AutomationScript> + 'a {
        self.scripts()
            .filter(move |s| &s.test_case_id == test_case_id)
    }

    /// Approve a script with no failed validation results. Returns its
    /// warnings for the reviewer.
    pub fn approve_script(
        &mut self,
        id: &ScriptId,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<ValidationResult>> {
        let current = self.script(id)?;
        check_expected("script", id, current.version, expected)?;
        let failed = current.failures().count();
        if failed > 0 {
            return Err(precondition(
                "script",
                id,
                "approve",
                format!("{failed} failed validation result(s)"),
                &["no failed validation results"],
            ));
        }
        let to = script_transition(id, current.status, ScriptAction::Approve)?;
        self.open_requirement(&current.requirement_id, "approve a script of")?;
        let warnings: Vec<ValidationResult> = current.warnings().cloned().collect();
        let version = current.version;

        if let Some(history) = self.scripts.get_mut(id) {
            let script = history.current_mut();
            script.status = to;
            script.approved_at = Some(now);
        }
        self.record(
            now,
            EntityKind::Script,
            id,
            "approve",
            Transition::moved(ScriptStatus::Draft, to),
            Some(version),
        );
        Ok(warnings)
    }

    pub fn reject_script(
        &mut self,
        id: &ScriptId,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let current = self.script(id)?;
        check_expected("script", id, current.version, expected)?;
        let from = current.status;
        let to = script_transition(id, from, ScriptAction::Reject)?;
        let version = current.version;

        if let Some(history) = self.scripts.get_mut(id) {
            history.current_mut().status = to;
        }
        self.record(
            now,
            EntityKind::Script,
            id,
            "reject",
            Transition::moved(from, to),
            Some(version),
        );
        Ok(())
    }
}

fn log_warnings(id: &ScriptId, results: &[ValidationResult]) {
    for result in results {
        if result.status == ValidationStatus::Warning {
            log::warn!("script {id}: {} - {}", result.rule, result.message);
        }
    }
}
