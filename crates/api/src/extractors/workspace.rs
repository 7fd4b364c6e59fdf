use std::collections::HashMap;

use axum::extract::{FromRef, FromRequestParts, Path};
use axum::http::request::Parts;
use bson::oid::ObjectId;
use hive_services::ActorContext;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

pub fn parse_id(raw: &str, name: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {} format", name)))
}

/// The caller resolved against the `{workspace_id}` path segment: their role
/// from the membership directory and, when `{project_id}` is also present,
/// whether they are on that project's member list.
///
/// Non-members are rejected with 403; unknown workspaces with 404.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceActor(pub ActorContext);

impl<S> FromRequestParts<S> for WorkspaceActor
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);

        let Path(params): Path<HashMap<String, String>> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest("Missing path parameters".to_string()))?;

        let raw = params
            .get("workspace_id")
            .ok_or_else(|| ApiError::BadRequest("Missing workspace_id parameter".to_string()))?;
        let workspace_id = parse_id(raw, "workspace_id")?;

        let role = match app_state
            .store
            .memberships
            .get(auth.user_id, workspace_id)
            .await?
        {
            Some(role) => role,
            None => {
                // Surfaces 404 for a workspace that does not exist at all.
                app_state.store.workspaces.find_by_id(workspace_id).await?;
                return Err(ApiError::Forbidden(
                    "You are not a member of this workspace".to_string(),
                ));
            }
        };

        let mut ctx = ActorContext::new(auth.user_id, workspace_id, role);
        if let Some(raw) = params.get("project_id") {
            let project_id = parse_id(raw, "project_id")?;
            let is_member = app_state
                .store
                .projects
                .is_member(project_id, auth.user_id)
                .await?;
            ctx = ctx.with_project_membership(is_member);
        }

        Ok(WorkspaceActor(ctx))
    }
}
