use chrono::{DateTime, Utc};

use super::{Ledger, Transition};
use crate::audit::EntityKind;
use crate::error::{CoreError, CoreResult};
use crate::ids::ProjectId;
use crate::lifecycle::precondition;
use crate::project::{
    validate_email, GenerationSettings, Member, NewProject, Project, ProjectStatus,
};

impl Ledger {
    /// Create a project; `defaults` apply when the input carries no settings.
    pub fn create_project(
        &mut self,
        input: NewProject,
        defaults: &GenerationSettings,
        now: DateTime<Utc>,
    ) -> CoreResult<ProjectId> {
        input.validate()?;
        let name = input.name.trim().to_string();
        if self
            .projects
            .values()
            .any(|p| p.name.eq_ignore_ascii_case(&name))
        {
            return Err(CoreError::conflict(
                "project",
                &name,
                "a project with this name already exists",
            ));
        }

        let id = self.sequences.next_project();
        let project = Project {
            id: id.clone(),
            name,
            description: input.description,
            product: input.product,
            release: input.release,
            owner: input.owner.trim().to_string(),
            status: ProjectStatus::Active,
            members: input.members,
            settings: input.settings.unwrap_or_else(|| defaults.clone()),
            created_at: now,
            updated_at: now,
        };
        self.projects.insert(id.clone(), project);
        self.record(
            now,
            EntityKind::Project,
            &id,
            "create",
            Transition::created(ProjectStatus::Active),
            None,
        );
        Ok(id)
    }

    pub fn project(&self, id: &ProjectId) -> CoreResult<&Project> {
        self.projects
            .get(id)
            .ok_or_else(|| CoreError::not_found("project", id))
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// The project, failing unless it is active
    pub(crate) fn active_project(&self, id: &ProjectId, action: &str) -> CoreResult<&Project> {
        let project = self.project(id)?;
        if !project.is_active() {
            return Err(precondition(
                "project",
                id,
                action,
                project.status,
                &[ProjectStatus::Active],
            ));
        }
        Ok(project)
    }

    /// Archive a project. Its children stay readable.
    pub fn archive_project(&mut self, id: &ProjectId, now: DateTime<Utc>) -> CoreResult<()> {
        self.active_project(id, "archive")?;
        if let Some(project) = self.projects.get_mut(id) {
            project.status = ProjectStatus::Archived;
            project.updated_at = now;
        }
        self.record(
            now,
            EntityKind::Project,
            id,
            "archive",
            Transition::moved(ProjectStatus::Active, ProjectStatus::Archived),
            None,
        );
        Ok(())
    }

    /// Add a member, or change the role of an existing one
    pub fn add_member(
        &mut self,
        id: &ProjectId,
        member: Member,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        validate_email(&member.email)?;
        self.active_project(id, "add a member to")?;
        let action = match self.projects.get_mut(id) {
            Some(project) => {
                let email = member.email.trim().to_ascii_lowercase();
                match project
                    .members
                    .iter_mut()
                    .find(|m| m.email.eq_ignore_ascii_case(&email))
                {
                    Some(existing) if existing.role == member.role => {
                        return Err(CoreError::conflict(
                            "project",
                            id,
                            format!("{email} is already a {}", member.role),
                        ));
                    }
                    Some(existing) => {
                        existing.role = member.role;
                        "change member role"
                    }
                    None => {
                        project.members.push(Member {
                            email,
                            role: member.role,
                        });
                        "add member"
                    }
                }
            }
            None => return Err(CoreError::not_found("project", id)),
        };
        if let Some(project) = self.projects.get_mut(id) {
            project.updated_at = now;
        }
        self.record(now, EntityKind::Project, id, action, Transition::none(), None);
        Ok(())
    }
}
