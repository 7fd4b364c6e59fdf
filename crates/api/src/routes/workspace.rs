use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use hive_db::models::{Theme, Visibility, Workspace, WorkspaceSettings};
use hive_services::coordinator::{MemberEntry, NewWorkspace, SettingsPatch, WorkspacePatch};
use hive_services::dao::base::{PaginatedResult, PaginationParams};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{ApiResult, hex, respond, respond_page, ts};
use crate::{extractors::auth::AuthUser, extractors::workspace::WorkspaceActor, state::AppState};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SettingsRequest {
    pub theme: Option<Theme>,
    pub notify_owner_on_member_join: Option<bool>,
    pub visibility: Option<Visibility>,
    pub require_approval: Option<bool>,
    #[validate(range(min = 1, max = 100))]
    pub max_members: Option<u32>,
}

impl From<SettingsRequest> for SettingsPatch {
    fn from(req: SettingsRequest) -> Self {
        SettingsPatch {
            theme: req.theme,
            notify_owner_on_member_join: req.notify_owner_on_member_join,
            visibility: req.visibility,
            require_approval: req.require_approval,
            max_members: req.max_members,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub icon: Option<String>,
    pub settings: Option<SettingsRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWorkspaceRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub icon: Option<String>,
    pub settings: Option<SettingsRequest>,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub icon: Option<String>,
    pub owner_id: String,
    pub settings: WorkspaceSettings,
    pub projects_count: u32,
    pub members_count: u32,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<Workspace> for WorkspaceResponse {
    fn from(ws: Workspace) -> Self {
        Self {
            id: hex(ws.id),
            name: ws.name,
            slug: ws.slug,
            description: ws.description,
            icon: ws.icon,
            owner_id: ws.owner_id.to_hex(),
            settings: ws.settings,
            projects_count: ws.projects_count,
            members_count: ws.members_count,
            created_at: ts(ws.created_at),
            updated_at: ts(ws.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub invited_by: Option<String>,
    pub joined_at: chrono::DateTime<Utc>,
}

impl From<MemberEntry> for MemberResponse {
    fn from(entry: MemberEntry) -> Self {
        Self {
            user_id: entry.member.user_id.to_hex(),
            username: entry.username,
            full_name: entry.full_name,
            email: entry.email,
            role: entry.member.role.to_string(),
            invited_by: entry.member.invited_by.map(|id| id.to_hex()),
            joined_at: ts(entry.member.joined_at),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResult<WorkspaceResponse>> {
    let pagination = params.resolve(state.settings.app.default_page_limit);
    let outcome = state
        .workspaces
        .list_for_user(auth.user_id, pagination)
        .await?;
    respond_page(outcome, WorkspaceResponse::from)
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateWorkspaceRequest>,
) -> ApiResult<WorkspaceResponse> {
    body.validate()?;
    if let Some(settings) = &body.settings {
        settings.validate()?;
    }
    let input = NewWorkspace {
        name: body.name,
        description: body.description,
        icon: body.icon,
        settings: body.settings.map(SettingsPatch::from),
    };
    let outcome = state.workspaces.create(&auth.identity(), input).await?;
    respond(outcome, WorkspaceResponse::from)
}

pub async fn get(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
) -> ApiResult<WorkspaceResponse> {
    let outcome = state.workspaces.get(&ctx).await?;
    respond(outcome, WorkspaceResponse::from)
}

pub async fn update(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Json(body): Json<UpdateWorkspaceRequest>,
) -> ApiResult<WorkspaceResponse> {
    body.validate()?;
    if let Some(settings) = &body.settings {
        settings.validate()?;
    }
    let patch = WorkspacePatch {
        name: body.name,
        description: body.description,
        icon: body.icon,
        settings: body.settings.map(SettingsPatch::from),
    };
    let outcome = state.workspaces.update(&ctx, patch).await?;
    respond(outcome, WorkspaceResponse::from)
}

pub async fn delete(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
) -> ApiResult<()> {
    let outcome = state.workspaces.delete(&ctx).await?;
    respond(outcome, |unit| unit)
}

pub async fn members(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResult<MemberResponse>> {
    let pagination = params.resolve(state.settings.app.default_page_limit);
    let outcome = state.workspaces.list_members(&ctx, pagination).await?;
    respond_page(outcome, MemberResponse::from)
}
