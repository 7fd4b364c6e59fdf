use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use hive_db::models::{InviteRole, InviteStatus, WorkspaceInvite, WorkspaceMember};
use hive_services::dao::base::{PaginatedResult, PaginationParams};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{ApiResult, hex, opt_ts, respond, respond_page, ts};
use crate::{
    extractors::auth::AuthUser,
    extractors::workspace::{WorkspaceActor, parse_id},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SendInviteRequest {
    #[validate(email)]
    pub email: String,
    pub role: InviteRole,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInviteRequest {
    #[validate(length(min = 1))]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct WorkspacePath {
    pub workspace_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InvitePath {
    pub invite_id: String,
}

/// Invite as shown to owners and invitees. The token digest is never sent.
#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub id: String,
    pub workspace_id: String,
    pub invited_by: String,
    pub email: String,
    pub role: InviteRole,
    pub status: InviteStatus,
    pub expires_at: Option<chrono::DateTime<Utc>>,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<WorkspaceInvite> for InviteResponse {
    fn from(invite: WorkspaceInvite) -> Self {
        Self {
            id: hex(invite.id),
            workspace_id: invite.workspace_id.to_hex(),
            invited_by: invite.invited_by.to_hex(),
            email: invite.email,
            role: invite.role,
            status: invite.status,
            expires_at: opt_ts(invite.token_expires_at),
            created_at: ts(invite.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub workspace_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: chrono::DateTime<Utc>,
}

impl From<WorkspaceMember> for MembershipResponse {
    fn from(member: WorkspaceMember) -> Self {
        Self {
            workspace_id: member.workspace_id.to_hex(),
            user_id: member.user_id.to_hex(),
            role: member.role.to_string(),
            joined_at: ts(member.joined_at),
        }
    }
}

pub async fn send(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Json(body): Json<SendInviteRequest>,
) -> ApiResult<InviteResponse> {
    body.validate()?;
    let outcome = state.invites.send(&ctx, &body.email, body.role).await?;
    respond(outcome, InviteResponse::from)
}

pub async fn list_for_workspace(
    State(state): State<AppState>,
    WorkspaceActor(ctx): WorkspaceActor,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResult<InviteResponse>> {
    let pagination = params.resolve(state.settings.app.default_page_limit);
    let outcome = state.invites.list_for_workspace(&ctx, pagination).await?;
    respond_page(outcome, InviteResponse::from)
}

/// The caller is not a member yet, so only authentication is required.
pub async fn accept(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<WorkspacePath>,
    Json(body): Json<AcceptInviteRequest>,
) -> ApiResult<MembershipResponse> {
    body.validate()?;
    let workspace_id = parse_id(&path.workspace_id, "workspace_id")?;
    let outcome = state
        .invites
        .accept(&auth.identity(), workspace_id, &body.token)
        .await?;
    respond(outcome, MembershipResponse::from)
}

pub async fn list_mine(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResult<InviteResponse>> {
    let pagination = params.resolve(state.settings.app.default_page_limit);
    let outcome = state
        .invites
        .list_for_user(&auth.identity(), pagination)
        .await?;
    respond_page(outcome, InviteResponse::from)
}

pub async fn decline(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<InvitePath>,
) -> ApiResult<InviteResponse> {
    let invite_id = parse_id(&path.invite_id, "invite_id")?;
    let outcome = state.invites.decline(&auth.identity(), invite_id).await?;
    respond(outcome, InviteResponse::from)
}
