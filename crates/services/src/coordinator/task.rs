use std::sync::Arc;

use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use hive_db::models::{
    AuditAction, Project, ResourceType, Role, Task, TaskPriority, TaskStatus, TaskType,
};
use mongodb::ClientSession;
use tracing::info;

use super::modified_by;
use crate::context::ActorContext;
use crate::dao::Store;
use crate::dao::audit::AuditTarget;
use crate::dao::base::{DaoError, DaoResult, PaginatedResult, Pagination};
use crate::dao::task::{TaskListQuery, list_filter};
use crate::outcome::Outcome;
use crate::permissions;
use crate::slug::slugify;
use crate::transaction::Transactions;

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub estimated_time: u32,
    pub due_date: DateTime,
    pub tags: Vec<String>,
    pub parent_task: Option<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub priority: Option<TaskPriority>,
    pub estimated_time: Option<u32>,
    pub due_date: Option<DateTime>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` detaches the task from its parent.
    pub parent_task: Option<Option<ObjectId>>,
}

pub struct TaskService {
    store: Arc<Store>,
    txn: Transactions,
}

fn task_id(task: &Task) -> DaoResult<ObjectId> {
    task.id.ok_or_else(|| DaoError::validation("Task has no id"))
}

fn slug_for(title: &str) -> DaoResult<String> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(DaoError::validation("Task title must contain letters or digits"));
    }
    Ok(slug)
}

/// `$set` fields for a status change. Completion stamps are set on `done`
/// and cleared on any other status.
fn status_fields(
    status: TaskStatus,
    actor: ObjectId,
    actual_time: Option<u32>,
    now: DateTime,
) -> Document {
    let mut set = doc! { "status": status.as_str() };
    if status == TaskStatus::Done {
        set.insert("completed_at", now);
        set.insert("completed_by", actor);
    } else {
        set.insert("completed_at", Bson::Null);
        set.insert("completed_by", Bson::Null);
    }
    if let Some(minutes) = actual_time {
        set.insert("actual_time", minutes as i64);
    }
    set
}

impl TaskService {
    pub fn new(store: Arc<Store>, txn: Transactions) -> Self {
        Self { store, txn }
    }

    async fn load_project(&self, ctx: &ActorContext, project_id: ObjectId) -> DaoResult<Project> {
        self.store
            .projects
            .find_in_workspace(ctx.workspace_id, project_id)
            .await
    }

    /// Gate for every task operation. Project membership is re-derived from
    /// the loaded project rather than taken from the caller.
    async fn load_contributable(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
    ) -> DaoResult<(ActorContext, Project)> {
        let project = self.load_project(ctx, project_id).await?;
        let ctx = ctx.with_project_membership(project.has_member(&ctx.user_id));
        if !permissions::can_contribute_tasks(ctx.role, ctx.is_project_member) {
            return Err(DaoError::forbidden("You are not a member of this project"));
        }
        Ok((ctx, project))
    }

    async fn load_task(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        task_id: ObjectId,
    ) -> DaoResult<Task> {
        self.store
            .tasks
            .find_in_project(ctx.workspace_id, project_id, task_id)
            .await
    }

    async fn audit(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        task_id: ObjectId,
        action: AuditAction,
        description: String,
    ) -> DaoResult<()> {
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ctx.workspace_id, ResourceType::Task, task_id),
                action,
                ctx.user_id,
                description,
            )
            .await
    }

    pub async fn create(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        input: NewTask,
    ) -> DaoResult<Outcome<Task>> {
        let (ctx, _project) = self.load_contributable(ctx, project_id).await?;
        let slug = slug_for(&input.title)?;
        if self
            .store
            .tasks
            .slug_taken(ctx.workspace_id, project_id, &slug, None)
            .await?
        {
            return Err(DaoError::conflict(
                "A task with this title already exists in this project",
            ));
        }
        if let Some(parent_id) = input.parent_task {
            self.load_task(&ctx, project_id, parent_id)
                .await
                .map_err(|_| DaoError::not_found("Parent task not found in this project"))?;
        }

        let now = DateTime::now();
        let status = input.status.unwrap_or_default();
        let task = Task {
            id: None,
            workspace_id: ctx.workspace_id,
            project_id,
            title: input.title,
            slug,
            description: input.description,
            task_type: input.task_type.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            status,
            is_personal: true,
            assignees: Vec::new(),
            creator: ctx.user_id,
            estimated_time: input.estimated_time,
            actual_time: None,
            due_date: input.due_date,
            tags: input.tags,
            completed_at: (status == TaskStatus::Done).then_some(now),
            completed_by: (status == TaskStatus::Done).then_some(ctx.user_id),
            parent_task: input.parent_task,
            subtasks: Vec::new(),
            last_modified_at: Some(now),
            last_modified_by: Some(ctx.user_id),
            created_at: now,
            updated_at: now,
        };

        let mut session = self.txn.begin().await?;
        let result = self.create_in(&mut session, &ctx, task).await;
        let task = self.txn.settle(session, result).await?;

        info!(task_id = ?task.id, %project_id, "Task created");
        Ok(Outcome::created("Task created successfully", task))
    }

    async fn create_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        task: Task,
    ) -> DaoResult<Task> {
        let task = self.store.tasks.insert(session, task).await?;
        let id = task_id(&task)?;
        if let Some(parent_id) = task.parent_task {
            self.store.tasks.push_subtask(session, parent_id, id).await?;
        }
        self.audit(
            session,
            ctx,
            id,
            AuditAction::Created,
            format!("Task \"{}\" created", task.title),
        )
        .await?;
        Ok(task)
    }

    pub async fn get(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        task_id: ObjectId,
    ) -> DaoResult<Outcome<Task>> {
        let (ctx, _) = self.load_contributable(ctx, project_id).await?;
        let task = self.load_task(&ctx, project_id, task_id).await?;
        Ok(Outcome::ok("Task retrieved successfully", task))
    }

    pub async fn list(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        query: &TaskListQuery,
        pagination: Pagination,
    ) -> DaoResult<Outcome<PaginatedResult<Task>>> {
        let (ctx, _) = self.load_contributable(ctx, project_id).await?;
        let filter = list_filter(ctx.workspace_id, project_id, ctx.user_id, ctx.role, query);
        let page = self.store.tasks.list(filter, pagination).await?;
        Ok(Outcome::ok("Tasks retrieved successfully", page))
    }

    pub async fn update(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        task_id: ObjectId,
        patch: TaskPatch,
    ) -> DaoResult<Outcome<Task>> {
        let (ctx, _project) = self.load_contributable(ctx, project_id).await?;
        let ctx = &ctx;
        let task = self.load_task(ctx, project_id, task_id).await?;
        if !permissions::can_edit_task_content(ctx.role, &ctx.user_id, &task.creator) {
            return Err(DaoError::forbidden("You cannot edit this task"));
        }

        let mut set = modified_by(ctx.user_id);
        if let Some(title) = patch.title.filter(|t| *t != task.title) {
            let slug = slug_for(&title)?;
            if self
                .store
                .tasks
                .slug_taken(ctx.workspace_id, project_id, &slug, Some(task_id))
                .await?
            {
                return Err(DaoError::conflict(
                    "A task with this title already exists in this project",
                ));
            }
            set.insert("title", title);
            set.insert("slug", slug);
        }
        if let Some(description) = patch.description {
            set.insert("description", description);
        }
        if let Some(task_type) = patch.task_type {
            set.insert("task_type", bson::to_bson(&task_type)?);
        }
        if let Some(priority) = patch.priority {
            set.insert("priority", priority.as_str());
        }
        if let Some(estimate) = patch.estimated_time {
            set.insert("estimated_time", estimate as i64);
        }
        if let Some(due) = patch.due_date {
            set.insert("due_date", due);
        }
        if let Some(tags) = patch.tags {
            set.insert("tags", tags);
        }

        let reparent = match patch.parent_task {
            Some(new_parent) if new_parent != task.parent_task => {
                if let Some(parent_id) = new_parent {
                    self.load_task(ctx, project_id, parent_id)
                        .await
                        .map_err(|_| DaoError::not_found("Parent task not found in this project"))?;
                }
                set.insert("parent_task", new_parent);
                Some(new_parent)
            }
            _ => None,
        };

        let mut session = self.txn.begin().await?;
        let result = self
            .update_in(&mut session, ctx, &task, set, reparent)
            .await;
        self.txn.settle(session, result).await?;

        let task = self.load_task(ctx, project_id, task_id).await?;
        Ok(Outcome::ok("Task updated successfully", task))
    }

    async fn update_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        task: &Task,
        set: Document,
        reparent: Option<Option<ObjectId>>,
    ) -> DaoResult<()> {
        let id = task_id(task)?;
        if let Some(new_parent) = reparent {
            if let Some(parent_id) = new_parent {
                if self
                    .store
                    .tasks
                    .is_ancestor_or_self(session, id, parent_id)
                    .await?
                {
                    return Err(DaoError::invalid_state(
                        "A task cannot become a subtask of itself or its descendants",
                    ));
                }
                self.store.tasks.push_subtask(session, parent_id, id).await?;
            }
            if let Some(old_parent) = task.parent_task {
                self.store.tasks.pull_subtask(session, old_parent, id).await?;
            }
        }

        self.store.tasks.update(session, id, doc! { "$set": set }).await?;
        self.audit(session, ctx, id, AuditAction::Updated, format!("Task \"{}\" updated", task.title))
            .await
    }

    pub async fn update_status(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        task_id: ObjectId,
        status: TaskStatus,
        actual_time: Option<u32>,
    ) -> DaoResult<Outcome<Task>> {
        let (ctx, _project) = self.load_contributable(ctx, project_id).await?;
        let ctx = &ctx;
        let task = self.load_task(ctx, project_id, task_id).await?;
        if !permissions::can_update_task_status(ctx.role, &ctx.user_id, &task.creator, &task.assignees) {
            return Err(DaoError::forbidden("You cannot change the status of this task"));
        }

        let mut set = modified_by(ctx.user_id);
        for (key, value) in status_fields(status, ctx.user_id, actual_time, DateTime::now()) {
            set.insert(key, value);
        }
        let description = format!(
            "Task status changed from {} to {}",
            task.status.as_str(),
            status.as_str()
        );

        let mut session = self.txn.begin().await?;
        let result = self
            .write_in(&mut session, ctx, task_id, doc! { "$set": set }, AuditAction::StatusChanged, description)
            .await;
        self.txn.settle(session, result).await?;

        let task = self.load_task(ctx, project_id, task_id).await?;
        Ok(Outcome::ok("Task status updated successfully", task))
    }

    async fn write_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        task_id: ObjectId,
        update: Document,
        action: AuditAction,
        description: String,
    ) -> DaoResult<()> {
        self.store.tasks.update(session, task_id, update).await?;
        self.audit(session, ctx, task_id, action, description).await
    }

    /// The assignee must belong to both the workspace and the project. Admins
    /// may not assign the owner or themselves.
    pub async fn assign(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        task_id: ObjectId,
        assignee: ObjectId,
    ) -> DaoResult<Outcome<Task>> {
        if !permissions::can_assign_tasks(ctx.role) {
            return Err(DaoError::forbidden("Only owners and admins can assign tasks"));
        }
        let (ctx, project) = self.load_contributable(ctx, project_id).await?;
        let ctx = &ctx;
        let task = self.load_task(ctx, project_id, task_id).await?;

        let assignee_role = self
            .store
            .memberships
            .get(assignee, ctx.workspace_id)
            .await?
            .ok_or_else(|| DaoError::not_found("Assignee is not a member of this workspace"))?;
        if ctx.role == Role::Admin && (assignee_role == Role::Owner || assignee == ctx.user_id) {
            return Err(DaoError::forbidden(
                "Admins cannot assign tasks to the workspace owner or to themselves",
            ));
        }
        if !project.has_member(&assignee) {
            return Err(DaoError::invalid_state("Assignee is not a member of this project"));
        }
        if task.is_assigned_to(&assignee) {
            return Err(DaoError::conflict("Task is already assigned to this user"));
        }

        let mut session = self.txn.begin().await?;
        let result = self.assign_in(&mut session, ctx, task_id, assignee).await;
        self.txn.settle(session, result).await?;

        let task = self.load_task(ctx, project_id, task_id).await?;
        Ok(Outcome::ok("Task assigned successfully", task))
    }

    async fn assign_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        task_id: ObjectId,
        assignee: ObjectId,
    ) -> DaoResult<()> {
        // The membership may have been revoked since the pre-checks.
        self.store
            .memberships
            .require_member(
                session,
                assignee,
                ctx.workspace_id,
                "Assignee is not a member of this workspace",
            )
            .await?;
        if !self
            .store
            .tasks
            .add_assignee(session, task_id, assignee, modified_by(ctx.user_id))
            .await?
        {
            return Err(DaoError::conflict("Task is already assigned to this user"));
        }
        self.audit(
            session,
            ctx,
            task_id,
            AuditAction::Assigned,
            format!("Task assigned to {}", assignee),
        )
        .await
    }

    pub async fn unassign(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        task_id: ObjectId,
        assignee: ObjectId,
    ) -> DaoResult<Outcome<Task>> {
        if !permissions::can_assign_tasks(ctx.role) {
            return Err(DaoError::forbidden("Only owners and admins can unassign tasks"));
        }
        let (ctx, _project) = self.load_contributable(ctx, project_id).await?;
        let ctx = &ctx;
        let task = self.load_task(ctx, project_id, task_id).await?;
        if !task.is_assigned_to(&assignee) {
            return Err(DaoError::invalid_state("Task is not assigned to this user"));
        }
        if ctx.role == Role::Admin {
            let role = self.store.memberships.get(assignee, ctx.workspace_id).await?;
            if role == Some(Role::Owner) {
                return Err(DaoError::forbidden(
                    "Admins cannot unassign tasks from the workspace owner",
                ));
            }
        }
        let now_personal = task.assignees.len() == 1;

        let mut session = self.txn.begin().await?;
        let result = self
            .unassign_in(&mut session, ctx, task_id, assignee, now_personal)
            .await;
        self.txn.settle(session, result).await?;

        let task = self.load_task(ctx, project_id, task_id).await?;
        Ok(Outcome::ok("Task unassigned successfully", task))
    }

    async fn unassign_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        task_id: ObjectId,
        assignee: ObjectId,
        now_personal: bool,
    ) -> DaoResult<()> {
        if !self
            .store
            .tasks
            .remove_assignee(session, task_id, assignee, now_personal, modified_by(ctx.user_id))
            .await?
        {
            return Err(DaoError::invalid_state("Task is not assigned to this user"));
        }
        self.audit(
            session,
            ctx,
            task_id,
            AuditAction::Unassigned,
            format!("Task unassigned from {}", assignee),
        )
        .await
    }

    /// Refuses while the task has subtasks or any assignee.
    pub async fn delete(
        &self,
        ctx: &ActorContext,
        project_id: ObjectId,
        task_id: ObjectId,
    ) -> DaoResult<Outcome<()>> {
        let (ctx, _project) = self.load_contributable(ctx, project_id).await?;
        let ctx = &ctx;
        let task = self.load_task(ctx, project_id, task_id).await?;
        if !permissions::can_delete_task(ctx.role, &ctx.user_id, &task.creator) {
            return Err(DaoError::forbidden("You cannot delete this task"));
        }
        if !task.subtasks.is_empty() {
            return Err(DaoError::invalid_state("Task has subtasks; delete them first"));
        }
        if !task.assignees.is_empty() {
            return Err(DaoError::invalid_state("Task is still assigned; unassign it first"));
        }

        let mut session = self.txn.begin().await?;
        let result = self.delete_in(&mut session, ctx, &task).await;
        self.txn.settle(session, result).await?;

        info!(%task_id, %project_id, "Task deleted");
        Ok(Outcome::ok_empty("Task deleted successfully"))
    }

    async fn delete_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        task: &Task,
    ) -> DaoResult<()> {
        let id = task_id(task)?;
        // Re-checked inside the transaction against concurrent subtask creation
        // or assignment.
        let current = self
            .store
            .tasks
            .find_in_project_in(session, ctx.workspace_id, task.project_id, id)
            .await?;
        if !current.subtasks.is_empty() || !current.assignees.is_empty() {
            return Err(DaoError::invalid_state(
                "Task gained subtasks or assignees; refresh and retry",
            ));
        }

        self.store.tasks.delete(session, id).await?;
        if let Some(parent_id) = task.parent_task {
            self.store.tasks.pull_subtask(session, parent_id, id).await?;
        }
        self.audit(
            session,
            ctx,
            id,
            AuditAction::Deleted,
            format!("Task \"{}\" deleted", task.title),
        )
        .await
    }
}
