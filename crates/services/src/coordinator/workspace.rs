use std::sync::Arc;

use bson::{Document, doc, oid::ObjectId};
use hive_db::models::{
    AuditAction, MAX_MEMBERS_CEILING, ResourceType, Theme, Visibility, Workspace, WorkspaceMember,
    WorkspaceSettings,
};
use mongodb::ClientSession;
use tracing::info;

use crate::context::{ActorContext, Identity};
use crate::dao::Store;
use crate::dao::audit::AuditTarget;
use crate::dao::base::{DaoError, DaoResult, PaginatedResult, Pagination};
use crate::outcome::Outcome;
use crate::permissions;
use crate::slug::slugify;
use crate::transaction::Transactions;

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub notify_owner_on_member_join: Option<bool>,
    pub visibility: Option<Visibility>,
    pub require_approval: Option<bool>,
    pub max_members: Option<u32>,
}

impl SettingsPatch {
    fn apply(self, settings: &mut WorkspaceSettings) -> DaoResult<()> {
        if let Some(max) = self.max_members {
            validate_max_members(max)?;
            settings.max_members = max;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(notify) = self.notify_owner_on_member_join {
            settings.notify_owner_on_member_join = notify;
        }
        if let Some(visibility) = self.visibility {
            settings.visibility = visibility;
        }
        if let Some(require) = self.require_approval {
            settings.require_approval = require;
        }
        Ok(())
    }
}

fn validate_max_members(max: u32) -> DaoResult<()> {
    if max == 0 || max > MAX_MEMBERS_CEILING {
        return Err(DaoError::validation(format!(
            "max_members must be between 1 and {}",
            MAX_MEMBERS_CEILING
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub settings: Option<SettingsPatch>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkspacePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub settings: Option<SettingsPatch>,
}

/// A membership row joined with the member's public profile.
#[derive(Debug, Clone)]
pub struct MemberEntry {
    pub member: WorkspaceMember,
    pub username: String,
    pub full_name: String,
    pub email: String,
}

pub struct WorkspaceService {
    store: Arc<Store>,
    txn: Transactions,
}

impl WorkspaceService {
    pub fn new(store: Arc<Store>, txn: Transactions) -> Self {
        Self { store, txn }
    }

    fn slug_for(name: &str) -> DaoResult<String> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(DaoError::validation(
                "Workspace name must contain letters or digits",
            ));
        }
        Ok(slug)
    }

    pub async fn create(&self, actor: &Identity, input: NewWorkspace) -> DaoResult<Outcome<Workspace>> {
        let slug = Self::slug_for(&input.name)?;
        if self.store.workspaces.slug_taken(&slug, None).await? {
            return Err(DaoError::conflict("A workspace with this name already exists"));
        }

        let mut settings = WorkspaceSettings::default();
        if let Some(patch) = input.settings {
            patch.apply(&mut settings)?;
        }

        let mut session = self.txn.begin().await?;
        let result = self
            .create_in(&mut session, actor.user_id, input.name, slug, input.description, input.icon, settings)
            .await;
        let workspace = self.txn.settle(session, result).await?;

        info!(workspace_id = ?workspace.id, owner = %actor.user_id, "Workspace created");
        Ok(Outcome::created("Workspace created successfully", workspace))
    }

    async fn create_in(
        &self,
        session: &mut ClientSession,
        owner_id: ObjectId,
        name: String,
        slug: String,
        description: Option<String>,
        icon: Option<String>,
        settings: WorkspaceSettings,
    ) -> DaoResult<Workspace> {
        let workspace = self
            .store
            .workspaces
            .insert(
                session,
                name,
                slug,
                description.unwrap_or_default(),
                icon,
                owner_id,
                settings,
            )
            .await?;
        let workspace_id = workspace
            .id
            .ok_or_else(|| DaoError::validation("Workspace has no id"))?;

        self.store
            .memberships
            .create_owner(session, owner_id, workspace_id)
            .await?;
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(workspace_id, ResourceType::Workspace, workspace_id),
                AuditAction::Created,
                owner_id,
                format!("Workspace \"{}\" created", workspace.name),
            )
            .await?;
        Ok(workspace)
    }

    pub async fn get(&self, ctx: &ActorContext) -> DaoResult<Outcome<Workspace>> {
        let workspace = self.store.workspaces.find_by_id(ctx.workspace_id).await?;
        Ok(Outcome::ok("Workspace retrieved successfully", workspace))
    }

    pub async fn list_for_user(
        &self,
        user_id: ObjectId,
        pagination: Pagination,
    ) -> DaoResult<Outcome<PaginatedResult<Workspace>>> {
        let ids = self
            .store
            .memberships
            .list_workspace_ids_for_user(user_id)
            .await?;
        let page = self.store.workspaces.list_by_ids(ids, pagination).await?;
        Ok(Outcome::ok("Workspaces retrieved successfully", page))
    }

    pub async fn list_members(
        &self,
        ctx: &ActorContext,
        pagination: Pagination,
    ) -> DaoResult<Outcome<PaginatedResult<MemberEntry>>> {
        let page = self
            .store
            .memberships
            .list_members(ctx.workspace_id, pagination)
            .await?;
        let user_ids: Vec<ObjectId> = page.items.iter().map(|m| m.user_id).collect();
        let users = self.store.users.find_many_by_ids(&user_ids).await?;

        let page = page.map(|member| {
            let user = users.iter().find(|u| u.id == Some(member.user_id));
            MemberEntry {
                username: user.map(|u| u.username.clone()).unwrap_or_default(),
                full_name: user.map(|u| u.full_name.clone()).unwrap_or_default(),
                email: user.map(|u| u.email.clone()).unwrap_or_default(),
                member,
            }
        });
        Ok(Outcome::ok("Workspace members retrieved successfully", page))
    }

    pub async fn update(
        &self,
        ctx: &ActorContext,
        patch: WorkspacePatch,
    ) -> DaoResult<Outcome<Workspace>> {
        let workspace = self.store.workspaces.find_by_id(ctx.workspace_id).await?;
        if !permissions::can_manage_workspace(&ctx.user_id, &workspace.owner_id) {
            return Err(DaoError::forbidden("Only the workspace owner can update it"));
        }

        let mut set = Document::new();
        if let Some(name) = patch.name.filter(|n| *n != workspace.name) {
            let slug = Self::slug_for(&name)?;
            if self
                .store
                .workspaces
                .slug_taken(&slug, Some(ctx.workspace_id))
                .await?
            {
                return Err(DaoError::conflict("A workspace with this name already exists"));
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
        if let Some(settings_patch) = patch.settings {
            let mut settings = workspace.settings.clone();
            settings_patch.apply(&mut settings)?;
            if settings.max_members < workspace.members_count {
                return Err(DaoError::invalid_state(
                    "max_members cannot be lower than the current member count",
                ));
            }
            set.insert("settings", bson::to_bson(&settings)?);
        }
        if set.is_empty() {
            return Ok(Outcome::ok("Nothing to update", workspace));
        }

        let mut session = self.txn.begin().await?;
        let result = self.update_in(&mut session, ctx, set).await;
        self.txn.settle(session, result).await?;

        let workspace = self.store.workspaces.find_by_id(ctx.workspace_id).await?;
        Ok(Outcome::ok("Workspace updated successfully", workspace))
    }

    async fn update_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        set: Document,
    ) -> DaoResult<()> {
        let fields: Vec<String> = set.keys().cloned().collect();
        self.store
            .workspaces
            .update(session, ctx.workspace_id, set)
            .await?;
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ctx.workspace_id, ResourceType::Workspace, ctx.workspace_id),
                AuditAction::Updated,
                ctx.user_id,
                format!("Workspace updated: {}", fields.join(", ")),
            )
            .await
    }

    /// Removes the workspace and everything it owns in one transaction:
    /// tasks, projects, invites and memberships, then the workspace row.
    pub async fn delete(&self, ctx: &ActorContext) -> DaoResult<Outcome<()>> {
        let workspace = self.store.workspaces.find_by_id(ctx.workspace_id).await?;
        if !permissions::can_manage_workspace(&ctx.user_id, &workspace.owner_id) {
            return Err(DaoError::forbidden("Only the workspace owner can delete it"));
        }

        let mut session = self.txn.begin().await?;
        let result = self.delete_in(&mut session, ctx, &workspace).await;
        self.txn.settle(session, result).await?;

        info!(workspace_id = %ctx.workspace_id, "Workspace deleted");
        Ok(Outcome::ok_empty("Workspace deleted successfully"))
    }

    async fn delete_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        workspace: &Workspace,
    ) -> DaoResult<()> {
        let ws = ctx.workspace_id;
        let tasks = self.store.tasks.delete_for_workspace(session, ws).await?;
        let projects = self.store.projects.delete_for_workspace(session, ws).await?;
        let invites = self.store.invites.delete_for_workspace(session, ws).await?;
        let members = self.store.memberships.delete_for_workspace(session, ws).await?;
        if !self.store.workspaces.delete(session, ws).await? {
            return Err(DaoError::not_found("Workspace not found"));
        }

        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ws, ResourceType::Workspace, ws),
                AuditAction::Deleted,
                ctx.user_id,
                format!(
                    "Workspace \"{}\" deleted with {} projects, {} tasks, {} invites, {} memberships",
                    workspace.name, projects, tasks, invites, members
                ),
            )
            .await
    }
}
