use std::sync::Arc;

use bson::{DateTime, Document, oid::ObjectId};
use hive_db::models::{AuditAction, Project, ProjectStatus, ResourceType, Role, User, Visibility};
use mongodb::ClientSession;
use tracing::info;

use super::modified_by;
use crate::context::ActorContext;
use crate::dao::Store;
use crate::dao::audit::AuditTarget;
use crate::dao::base::{DaoError, DaoResult, PaginatedResult, Pagination};
use crate::dao::project::{ProjectListQuery, list_filter};
use crate::outcome::Outcome;
use crate::permissions;
use crate::slug::slugify;
use crate::transaction::Transactions;

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub status: Option<ProjectStatus>,
    pub visibility: Option<Visibility>,
    pub start_date: Option<DateTime>,
    pub end_date: Option<DateTime>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub visibility: Option<Visibility>,
    pub start_date: Option<DateTime>,
    pub end_date: Option<DateTime>,
    pub tags: Option<Vec<String>>,
}

pub struct ProjectService {
    store: Arc<Store>,
    txn: Transactions,
}

fn project_id(project: &Project) -> DaoResult<ObjectId> {
    project
        .id
        .ok_or_else(|| DaoError::validation("Project has no id"))
}

fn slug_for(name: &str) -> DaoResult<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(DaoError::validation("Project name must contain letters or digits"));
    }
    Ok(slug)
}

fn check_dates(start: Option<DateTime>, end: Option<DateTime>) -> DaoResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(DaoError::validation("end_date cannot precede start_date"));
        }
    }
    Ok(())
}

impl ProjectService {
    pub fn new(store: Arc<Store>, txn: Transactions) -> Self {
        Self { store, txn }
    }

    /// Loads a project the actor is allowed to see. Invisible projects read
    /// as absent so their existence is not disclosed.
    async fn load_visible(&self, ctx: &ActorContext, project_id: ObjectId) -> DaoResult<Project> {
        let project = self
            .store
            .projects
            .find_in_workspace(ctx.workspace_id, project_id)
            .await?;
        if !permissions::can_view_project(
            ctx.role,
            &ctx.user_id,
            project.visibility,
            &project.created_by,
            &project.members,
        ) {
            return Err(DaoError::not_found("Project not found"));
        }
        Ok(project)
    }

    async fn load_managed(&self, ctx: &ActorContext, project_id: ObjectId) -> DaoResult<Project> {
        let project = self.load_visible(ctx, project_id).await?;
        if !permissions::can_manage_project(&ctx.user_id, ctx.role, &project.created_by) {
            return Err(DaoError::forbidden(
                "Only the workspace owner or the project creator can manage this project",
            ));
        }
        Ok(project)
    }

    pub async fn create(&self, ctx: &ActorContext, input: NewProject) -> DaoResult<Outcome<Project>> {
        if !permissions::can_create_project(ctx.role) {
            return Err(DaoError::forbidden("Only owners and admins can create projects"));
        }
        check_dates(input.start_date, input.end_date)?;
        let slug = slug_for(&input.name)?;
        if self.store.projects.slug_taken(&slug, None).await? {
            return Err(DaoError::conflict("A project with this name already exists"));
        }

        let mut members = vec![ctx.user_id];
        if ctx.role == Role::Admin {
            let workspace = self.store.workspaces.find_by_id(ctx.workspace_id).await?;
            if workspace.owner_id != ctx.user_id {
                members.push(workspace.owner_id);
            }
        }

        let now = DateTime::now();
        let project = Project {
            id: None,
            workspace_id: ctx.workspace_id,
            name: input.name,
            slug,
            description: input.description,
            created_by: ctx.user_id,
            members,
            icon: input.icon,
            color: input.color,
            status: input.status.unwrap_or_default(),
            visibility: input.visibility.unwrap_or_default(),
            start_date: input.start_date,
            end_date: input.end_date,
            tags: input.tags,
            last_modified_at: Some(now),
            last_modified_by: Some(ctx.user_id),
            created_at: now,
            updated_at: now,
        };

        let mut session = self.txn.begin().await?;
        let result = self.create_in(&mut session, ctx, project).await;
        let project = self.txn.settle(session, result).await?;

        info!(project_id = ?project.id, workspace_id = %ctx.workspace_id, "Project created");
        Ok(Outcome::created("Project created successfully", project))
    }

    async fn create_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        project: Project,
    ) -> DaoResult<Project> {
        let project = self.store.projects.insert(session, project).await?;
        let id = project_id(&project)?;
        self.store
            .workspaces
            .adjust_projects_count(session, ctx.workspace_id, 1)
            .await?;
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ctx.workspace_id, ResourceType::Project, id),
                AuditAction::Created,
                ctx.user_id,
                format!("Project \"{}\" created", project.name),
            )
            .await?;
        Ok(project)
    }

    pub async fn get(&self, ctx: &ActorContext, project_id: ObjectId) -> DaoResult<Outcome<Project>> {
        let project = self.load_visible(ctx, project_id).await?;
        Ok(Outcome::ok("Project retrieved successfully", project))
    }

    pub async fn list(
        &self,
        ctx: &ActorContext,
        query: &ProjectListQuery,
        pagination: Pagination,
    ) -> DaoResult<Outcome<PaginatedResult<Project>>> {
        let filter = list_filter(ctx.workspace_id, ctx.user_id, ctx.role, query);
        let page = self.store.projects.list(filter, pagination).await?;
        Ok(Outcome::ok("Projects retrieved successfully", page))
    }

    pub async fn update(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        patch: ProjectPatch,
    ) -> DaoResult<Outcome<Project>> {
        let project = self.load_managed(ctx, project_id).await?;
        check_dates(
            patch.start_date.or(project.start_date),
            patch.end_date.or(project.end_date),
        )?;

        let mut set = modified_by(ctx.user_id);
        if let Some(name) = patch.name.filter(|n| *n != project.name) {
            let slug = slug_for(&name)?;
            if self.store.projects.slug_taken(&slug, Some(project_id)).await? {
                return Err(DaoError::conflict("A project with this name already exists"));
            }
            set.insert("name", name);
            set.insert("slug", slug);
        }
        if let Some(description) = patch.description {
            set.insert("description", description);
        }
        if let Some(icon) = patch.icon {
            set.insert("icon", icon);
        }
        if let Some(color) = patch.color {
            set.insert("color", color);
        }
        if let Some(visibility) = patch.visibility {
            set.insert("visibility", visibility.as_str());
        }
        if let Some(start) = patch.start_date {
            set.insert("start_date", start);
        }
        if let Some(end) = patch.end_date {
            set.insert("end_date", end);
        }
        if let Some(tags) = patch.tags {
            set.insert("tags", tags);
        }

        let mut session = self.txn.begin().await?;
        let result = self
            .write_in(&mut session, ctx, project_id, set, AuditAction::Updated, "Project updated".to_string())
            .await;
        self.txn.settle(session, result).await?;

        let project = self
            .store
            .projects
            .find_in_workspace(ctx.workspace_id, project_id)
            .await?;
        Ok(Outcome::ok("Project updated successfully", project))
    }

    pub async fn update_status(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        status: ProjectStatus,
    ) -> DaoResult<Outcome<Project>> {
        let mut project = self.load_managed(ctx, project_id).await?;
        if project.status == status {
            return Ok(Outcome::ok("Project status unchanged", project));
        }

        let mut set = modified_by(ctx.user_id);
        set.insert("status", status.as_str());
        let description = format!(
            "Project status changed from {} to {}",
            project.status.as_str(),
            status.as_str()
        );

        let mut session = self.txn.begin().await?;
        let result = self
            .write_in(&mut session, ctx, project_id, set, AuditAction::StatusChanged, description)
            .await;
        self.txn.settle(session, result).await?;

        project.status = status;
        Ok(Outcome::ok("Project status updated successfully", project))
    }

    async fn write_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        project_id: ObjectId,
        set: Document,
        action: AuditAction,
        description: String,
    ) -> DaoResult<()> {
        self.store.projects.update(session, project_id, set).await?;
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ctx.workspace_id, ResourceType::Project, project_id),
                action,
                ctx.user_id,
                description,
            )
            .await
    }

    /// Refuses while any task remains under the project.
    pub async fn delete(&self, ctx: &ActorContext, project_id: ObjectId) -> DaoResult<Outcome<()>> {
        let project = self.load_managed(ctx, project_id).await?;

        let mut session = self.txn.begin().await?;
        let result = self.delete_in(&mut session, ctx, &project).await;
        self.txn.settle(session, result).await?;

        info!(%project_id, workspace_id = %ctx.workspace_id, "Project deleted");
        Ok(Outcome::ok_empty("Project deleted successfully"))
    }

    async fn delete_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        project: &Project,
    ) -> DaoResult<()> {
        let id = project_id(project)?;
        let remaining = self.store.tasks.count_for_project(session, id).await?;
        if remaining > 0 {
            return Err(DaoError::invalid_state(format!(
                "Project still has {} task(s); delete them first",
                remaining
            )));
        }

        if !self.store.projects.delete(session, id).await? {
            return Err(DaoError::not_found("Project not found"));
        }
        self.store
            .workspaces
            .adjust_projects_count(session, ctx.workspace_id, -1)
            .await?;
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ctx.workspace_id, ResourceType::Project, id),
                AuditAction::Deleted,
                ctx.user_id,
                format!("Project \"{}\" deleted", project.name),
            )
            .await
    }

    pub async fn list_members(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
    ) -> DaoResult<Outcome<Vec<User>>> {
        let project = self.load_visible(ctx, project_id).await?;
        let users = self.store.users.find_many_by_ids(&project.members).await?;
        Ok(Outcome::ok("Project members retrieved successfully", users))
    }

    pub async fn add_member(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Outcome<Project>> {
        let project = self.load_managed(ctx, project_id).await?;
        if user_id == ctx.user_id {
            return Err(DaoError::invalid_state("You cannot add yourself to a project"));
        }
        let target_role = self
            .store
            .memberships
            .get(user_id, ctx.workspace_id)
            .await?
            .ok_or_else(|| DaoError::not_found("User is not a member of this workspace"))?;
        if ctx.role == Role::Admin && target_role == Role::Admin {
            return Err(DaoError::forbidden("Admins cannot add other admins to a project"));
        }
        if project.has_member(&user_id) {
            return Err(DaoError::conflict("User is already a member of this project"));
        }

        let mut session = self.txn.begin().await?;
        let result = self.add_member_in(&mut session, ctx, project_id, user_id).await;
        self.txn.settle(session, result).await?;

        let project = self
            .store
            .projects
            .find_in_workspace(ctx.workspace_id, project_id)
            .await?;
        Ok(Outcome::ok("Member added to project successfully", project))
    }

    async fn add_member_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        project_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<()> {
        if !self
            .store
            .projects
            .add_member(session, project_id, user_id, modified_by(ctx.user_id))
            .await?
        {
            return Err(DaoError::conflict("User is already a member of this project"));
        }
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ctx.workspace_id, ResourceType::Project, project_id),
                AuditAction::MemberAdded,
                ctx.user_id,
                format!("User {} added to project", user_id),
            )
            .await
    }

    /// Drops a member and, in the same transaction, unassigns them from every
    /// task of this project. Tasks in other projects are untouched.
    pub async fn remove_member(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Outcome<Project>> {
        let project = self.load_managed(ctx, project_id).await?;
        if user_id == project.created_by {
            return Err(DaoError::invalid_state("The project creator cannot be removed"));
        }
        if !project.has_member(&user_id) {
            return Err(DaoError::invalid_state("User is not a member of this project"));
        }
        if ctx.role == Role::Admin {
            let target_role = self.store.memberships.get(user_id, ctx.workspace_id).await?;
            if matches!(target_role, Some(Role::Admin) | Some(Role::Owner)) && user_id != ctx.user_id {
                return Err(DaoError::forbidden(
                    "Admins cannot remove the owner or other admins from a project",
                ));
            }
        }

        let mut session = self.txn.begin().await?;
        let result = self.remove_member_in(&mut session, ctx, project_id, user_id).await;
        let unassigned = self.txn.settle(session, result).await?;

        info!(%project_id, %user_id, unassigned, "Project member removed");
        let project = self
            .store
            .projects
            .find_in_workspace(ctx.workspace_id, project_id)
            .await?;
        Ok(Outcome::ok("Member removed from project successfully", project))
    }

    async fn remove_member_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        project_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<u64> {
        if !self
            .store
            .projects
            .remove_member(session, project_id, user_id, modified_by(ctx.user_id))
            .await?
        {
            return Err(DaoError::invalid_state("User is not a member of this project"));
        }
        let unassigned = self
            .store
            .tasks
            .unassign_in_project(session, project_id, user_id, modified_by(ctx.user_id))
            .await?;
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ctx.workspace_id, ResourceType::Project, project_id),
                AuditAction::MemberRemoved,
                ctx.user_id,
                format!(
                    "User {} removed from project and unassigned from {} task(s)",
                    user_id, unassigned
                ),
            )
            .await?;
        Ok(unassigned)
    }
}
