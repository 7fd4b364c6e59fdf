use axum::{
    Json,
    extract::{Path, Query, State},
};
use bson::{DateTime, oid::ObjectId};
use chrono::Utc;
use hive_db::models::{Task, TaskPriority, TaskStatus, TaskType};
use hive_services::coordinator::{NewTask, TaskPatch};
use hive_services::dao::base::{PaginatedResult, PaginationParams};
use hive_services::dao::task::TaskListQuery;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::common::{ApiResult, hex, hex_all, opt_ts, parse_user_id, respond, respond_page, ts};
use crate::{
    error::ApiError,
    extractors::workspace::{WorkspaceActor, parse_id},
    state::AppState,
};

/// Keeps an explicit `null` apart from an absent field.
fn explicit_null<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    /// Minutes.
    pub estimated_time: u32,
    pub due_date: chrono::DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub parent_task: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub priority: Option<TaskPriority>,
    pub estimated_time: Option<u32>,
    pub due_date: Option<chrono::DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub parent_task: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
    pub actual_time: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectPath {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskPath {
    pub project_id: String,
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AssigneePath {
    pub project_id: String,
    pub task_id: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub is_personal: bool,
    pub assignees: Vec<String>,
    pub creator: String,
    pub estimated_time: u32,
    pub actual_time: Option<u32>,
    pub due_date: chrono::DateTime<Utc>,
    pub tags: Vec<String>,
    pub completed_at: Option<chrono::DateTime<Utc>>,
    pub completed_by: Option<String>,
    pub parent_task: Option<String>,
    pub subtasks: Vec<String>,
    pub last_modified_at: Option<chrono::DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(t: Task) -> Self {
        Self {
            id: hex(t.id),
            workspace_id: t.workspace_id.to_hex(),
            project_id: t.project_id.to_hex(),
            title: t.title,
            slug: t.slug,
            description: t.description,
            task_type: t.task_type,
            priority: t.priority,
            status: t.status,
            is_personal: t.is_personal,
            assignees: hex_all(&t.assignees),
            creator: t.creator.to_hex(),
            estimated_time: t.estimated_time,
            actual_time: t.actual_time,
            due_date: ts(t.due_date),
            tags: t.tags,
            completed_at: opt_ts(t.completed_at),
            completed_by: t.completed_by.map(|id| id.to_hex()),
            parent_task: t.parent_task.map(|id| id.to_hex()),
            subtasks: hex_all(&t.subtasks),
            last_modified_at: opt_ts(t.last_modified_at),
            last_modified_by: t.last_modified_by.map(|id| id.to_hex()),
            created_at: ts(t.created_at),
            updated_at: ts(t.updated_at),
        }
    }
}

fn ids(path: &TaskPath) -> Result<(ObjectId, ObjectId), ApiError> {
    Ok((
        parse_id(&path.project_id, "project_id")?,
        parse_id(&path.task_id, "task_id")?,
    ))
}

fn parse_parent(raw: Option<&str>) -> Result<Option<ObjectId>, ApiError> {
    raw.map(|id| parse_id(id, "parent_task")).transpose()
}

pub async fn list(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectPath>,
    Query(params): Query<ListParams>,
) -> ApiResult<PaginatedResult<TaskResponse>> {
    let project_id = parse_id(&path.project_id, "project_id")?;
    let pagination = PaginationParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(state.settings.app.default_page_limit);
    let query = TaskListQuery {
        search: params.search,
        status: params.status,
        priority: params.priority,
    };
    let outcome = state
        .tasks
        .list(&ctx, project_id, &query, pagination)
        .await?;
    respond_page(outcome, TaskResponse::from)
}

pub async fn create(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectPath>,
    Json(body): Json<CreateTaskRequest>,
) -> ApiResult<TaskResponse> {
    body.validate()?;
    let project_id = parse_id(&path.project_id, "project_id")?;
    let input = NewTask {
        title: body.title,
        description: body.description,
        task_type: body.task_type,
        priority: body.priority,
        status: body.status,
        estimated_time: body.estimated_time,
        due_date: DateTime::from_chrono(body.due_date),
        tags: body.tags,
        parent_task: parse_parent(body.parent_task.as_deref())?,
    };
    let outcome = state.tasks.create(&ctx, project_id, input).await?;
    respond(outcome, TaskResponse::from)
}

pub async fn get(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<TaskPath>,
) -> ApiResult<TaskResponse> {
    let (project_id, task_id) = ids(&path)?;
    let outcome = state.tasks.get(&ctx, project_id, task_id).await?;
    respond(outcome, TaskResponse::from)
}

pub async fn update(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<TaskPath>,
    Json(body): Json<UpdateTaskRequest>,
) -> ApiResult<TaskResponse> {
    body.validate()?;
    let (project_id, task_id) = ids(&path)?;
    let parent_task = match body.parent_task {
        Some(parent) => Some(parse_parent(parent.as_deref())?),
        None => None,
    };
    let patch = TaskPatch {
        title: body.title,
        description: body.description,
        task_type: body.task_type,
        priority: body.priority,
        estimated_time: body.estimated_time,
        due_date: body.due_date.map(DateTime::from_chrono),
        tags: body.tags,
        parent_task,
    };
    let outcome = state
        .tasks
        .update(&ctx, project_id, task_id, patch)
        .await?;
    respond(outcome, TaskResponse::from)
}

pub async fn update_status(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<TaskPath>,
    Json(body): Json<TaskStatusRequest>,
) -> ApiResult<TaskResponse> {
    let (project_id, task_id) = ids(&path)?;
    let outcome = state
        .tasks
        .update_status(&ctx, project_id, task_id, body.status, body.actual_time)
        .await?;
    respond(outcome, TaskResponse::from)
}

pub async fn assign(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<TaskPath>,
    Json(body): Json<AssignRequest>,
) -> ApiResult<TaskResponse> {
    let (project_id, task_id) = ids(&path)?;
    let assignee = parse_user_id(&body.user_id)?;
    let outcome = state
        .tasks
        .assign(&ctx, project_id, task_id, assignee)
        .await?;
    respond(outcome, TaskResponse::from)
}

pub async fn unassign(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<AssigneePath>,
) -> ApiResult<TaskResponse> {
    let project_id = parse_id(&path.project_id, "project_id")?;
    let task_id = parse_id(&path.task_id, "task_id")?;
    let assignee = parse_user_id(&path.user_id)?;
    let outcome = state
        .tasks
        .unassign(&ctx, project_id, task_id, assignee)
        .await?;
    respond(outcome, TaskResponse::from)
}

pub async fn delete(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<TaskPath>,
) -> ApiResult<()> {
    let (project_id, task_id) = ids(&path)?;
    let outcome = state.tasks.delete(&ctx, project_id, task_id).await?;
    respond(outcome, |unit| unit)
}
