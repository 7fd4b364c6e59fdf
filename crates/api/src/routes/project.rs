use axum::{
    Json,
    extract::{Path, Query, State},
};
use bson::{DateTime, oid::ObjectId};
use chrono::Utc;
use hive_db::models::{Project, ProjectStatus, Visibility};
use hive_services::coordinator::{NewProject, ProjectPatch};
use hive_services::dao::base::{PaginatedResult, PaginationParams};
use hive_services::dao::project::ProjectListQuery;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{
    ApiResult, UserResponse, hex, hex_all, opt_ts, parse_user_id, respond, respond_page, ts,
};
use crate::{
    error::ApiError,
    extractors::workspace::{WorkspaceActor, parse_id},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub status: Option<ProjectStatus>,
    pub visibility: Option<Visibility>,
    pub start_date: Option<chrono::DateTime<Utc>>,
    pub end_date: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub visibility: Option<Visibility>,
    pub start_date: Option<chrono::DateTime<Utc>>,
    pub end_date: Option<chrono::DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ProjectStatus,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectPath {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectMemberPath {
    pub project_id: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_by: String,
    pub members: Vec<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub status: ProjectStatus,
    pub visibility: Visibility,
    pub start_date: Option<chrono::DateTime<Utc>>,
    pub end_date: Option<chrono::DateTime<Utc>>,
    pub tags: Vec<String>,
    pub last_modified_at: Option<chrono::DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: hex(p.id),
            workspace_id: p.workspace_id.to_hex(),
            name: p.name,
            slug: p.slug,
            description: p.description,
            created_by: p.created_by.to_hex(),
            members: hex_all(&p.members),
            icon: p.icon,
            color: p.color,
            status: p.status,
            visibility: p.visibility,
            start_date: opt_ts(p.start_date),
            end_date: opt_ts(p.end_date),
            tags: p.tags,
            last_modified_at: opt_ts(p.last_modified_at),
            last_modified_by: p.last_modified_by.map(|id| id.to_hex()),
            created_at: ts(p.created_at),
            updated_at: ts(p.updated_at),
        }
    }
}

fn project_id(path: &ProjectPath) -> Result<ObjectId, ApiError> {
    parse_id(&path.project_id, "project_id")
}

pub async fn list(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Query(params): Query<ListParams>,
) -> ApiResult<PaginatedResult<ProjectResponse>> {
    let pagination = PaginationParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(state.settings.app.default_page_limit);
    let query = ProjectListQuery {
        search: params.search,
        status: params.status,
        visibility: params.visibility,
    };
    let outcome = state.projects.list(&ctx, &query, pagination).await?;
    respond_page(outcome, ProjectResponse::from)
}

pub async fn create(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<ProjectResponse> {
    body.validate()?;
    let input = NewProject {
        name: body.name,
        description: body.description,
        icon: body.icon,
        color: body.color,
        status: body.status,
        visibility: body.visibility,
        start_date: body.start_date.map(DateTime::from_chrono),
        end_date: body.end_date.map(DateTime::from_chrono),
        tags: body.tags,
    };
    let outcome = state.projects.create(&ctx, input).await?;
    respond(outcome, ProjectResponse::from)
}

pub async fn get(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectPath>,
) -> ApiResult<ProjectResponse> {
    let outcome = state.projects.get(&ctx, project_id(&path)?).await?;
    respond(outcome, ProjectResponse::from)
}

pub async fn update(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectPath>,
    Json(body): Json<UpdateProjectRequest>,
) -> ApiResult<ProjectResponse> {
    body.validate()?;
    let patch = ProjectPatch {
        name: body.name,
        description: body.description,
        icon: body.icon,
        color: body.color,
        visibility: body.visibility,
        start_date: body.start_date.map(DateTime::from_chrono),
        end_date: body.end_date.map(DateTime::from_chrono),
        tags: body.tags,
    };
    let outcome = state
        .projects
        .update(&ctx, project_id(&path)?, patch)
        .await?;
    respond(outcome, ProjectResponse::from)
}

pub async fn update_status(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectPath>,
    Json(body): Json<UpdateStatusRequest>,
) -> ApiResult<ProjectResponse> {
    let outcome = state
        .projects
        .update_status(&ctx, project_id(&path)?, body.status)
        .await?;
    respond(outcome, ProjectResponse::from)
}

pub async fn delete(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectPath>,
) -> ApiResult<()> {
    let outcome = state.projects.delete(&ctx, project_id(&path)?).await?;
    respond(outcome, |unit| unit)
}

pub async fn members(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectPath>,
) -> ApiResult<Vec<UserResponse>> {
    let outcome = state
        .projects
        .list_members(&ctx, project_id(&path)?)
        .await?;
    respond(outcome, |users| {
        users.into_iter().map(UserResponse::from).collect()
    })
}

pub async fn add_member(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectPath>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<ProjectResponse> {
    let user_id = parse_user_id(&body.user_id)?;
    let outcome = state
        .projects
        .add_member(&ctx, project_id(&path)?, user_id)
        .await?;
    respond(outcome, ProjectResponse::from)
}

pub async fn remove_member(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Path(path): Path<ProjectMemberPath>,
) -> ApiResult<ProjectResponse> {
    let project_id = parse_id(&path.project_id, "project_id")?;
    let user_id = parse_user_id(&path.user_id)?;
    let outcome = state
        .projects
        .remove_member(&ctx, project_id, user_id)
        .await?;
    respond(outcome, ProjectResponse::from)
}
