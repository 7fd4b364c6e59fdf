use std::sync::Arc;
use std::time::Duration;

use bson::{DateTime, oid::ObjectId};
use hive_db::models::{AuditAction, InviteRole, ResourceType, WorkspaceInvite, WorkspaceMember};
use mongodb::ClientSession;
use tracing::{error, info, warn};

use crate::auth::token;
use crate::context::{ActorContext, Identity};
use crate::dao::Store;
use crate::dao::audit::AuditTarget;
use crate::dao::base::{DaoError, DaoResult, PaginatedResult, Pagination};
use crate::mail::{Mailer, templates};
use crate::outcome::Outcome;
use crate::permissions;
use crate::transaction::Transactions;

const INVALID_TOKEN: &str = "Invalid or expired invite token";

/// Issues, accepts and declines workspace invites.
///
/// Only the SHA-256 of an invite token is stored. Acceptance flips the invite
/// to `accepted` with a conditional update and creates the membership in the
/// same transaction, so a token admits at most one member.
pub struct InviteService {
    store: Arc<Store>,
    txn: Transactions,
    mailer: Arc<dyn Mailer>,
    ttl: Duration,
    frontend_url: String,
}

impl InviteService {
    pub fn new(
        store: Arc<Store>,
        txn: Transactions,
        mailer: Arc<dyn Mailer>,
        ttl: Duration,
        frontend_url: String,
    ) -> Self {
        Self {
            store,
            txn,
            mailer,
            ttl,
            frontend_url,
        }
    }

    pub async fn send(
        &self,
        ctx: &ActorContext,
        email: &str,
        role: InviteRole,
    ) -> DaoResult<Outcome<WorkspaceInvite>> {
        let email = email.trim().to_lowercase();
        let workspace = self.store.workspaces.find_by_id(ctx.workspace_id).await?;
        if !permissions::can_manage_workspace(&ctx.user_id, &workspace.owner_id) {
            return Err(DaoError::forbidden("Only the workspace owner can send invites"));
        }

        let target = self
            .store
            .users
            .find_active_by_email(&email)
            .await?
            .ok_or_else(|| DaoError::not_found("No active user is registered with this email"))?;
        let target_id = target
            .id
            .ok_or_else(|| DaoError::validation("User has no id"))?;
        if target_id == ctx.user_id {
            return Err(DaoError::invalid_state("You cannot invite yourself"));
        }
        if self
            .store
            .memberships
            .is_member(target_id, ctx.workspace_id)
            .await?
        {
            return Err(DaoError::conflict("The user is already a member of this workspace"));
        }
        if self.store.invites.has_active(ctx.workspace_id, &email).await? {
            return Err(DaoError::conflict(
                "An active invite already exists for this email",
            ));
        }
        if workspace.members_count >= workspace.settings.max_members {
            return Err(DaoError::conflict("The workspace has reached its member limit"));
        }

        let inviter = self.store.users.find_by_id(ctx.user_id).await?;

        let (plain, digest) = token::issue();
        let expires_at =
            DateTime::from_millis(DateTime::now().timestamp_millis() + self.ttl.as_millis() as i64);

        let mut session = self.txn.begin().await?;
        let result = self
            .issue_in(&mut session, ctx, email.clone(), role, digest, expires_at)
            .await;
        let invite = self.txn.settle(session, result).await?;
        let invite_id = invite
            .id
            .ok_or_else(|| DaoError::validation("Invite has no id"))?;

        let mail = templates::workspace_invite(
            &email,
            &self.frontend_url,
            &ctx.workspace_id.to_hex(),
            &workspace.name,
            &inviter.full_name,
            role,
            &plain,
            self.ttl.as_secs() / 3600,
        );
        if let Err(send_err) = self.mailer.send(mail).await {
            error!(%invite_id, %send_err, "Invite email failed; rolling back invite");
            self.compensate(ctx, invite_id).await?;
            return Err(DaoError::Dependency(
                "The invite email could not be sent; the invite was not created".to_string(),
            ));
        }

        info!(%invite_id, workspace_id = %ctx.workspace_id, "Invite sent");
        Ok(Outcome::created("Invite sent successfully", invite))
    }

    async fn issue_in(
        &self,
        session: &mut ClientSession,
        ctx: &ActorContext,
        email: String,
        role: InviteRole,
        digest: String,
        expires_at: DateTime,
    ) -> DaoResult<WorkspaceInvite> {
        self.store
            .invites
            .expire_stale_for(session, ctx.workspace_id, &email)
            .await?;
        // A concurrent send for the same pair trips the pending-invite index.
        let invite = self
            .store
            .invites
            .insert(session, ctx.workspace_id, ctx.user_id, email, role, digest, expires_at)
            .await
            .map_err(|e| e.on_duplicate("An active invite already exists for this email"))?;
        let invite_id = invite
            .id
            .ok_or_else(|| DaoError::validation("Invite has no id"))?;
        self.store
            .audit
            .append(
                session,
                AuditTarget::new(ctx.workspace_id, ResourceType::Invite, invite_id),
                AuditAction::Created,
                ctx.user_id,
                format!("Invited {} as {:?}", invite.email, role),
            )
            .await?;
        Ok(invite)
    }

    /// Deletes an invite whose notification failed.
    async fn compensate(&self, ctx: &ActorContext, invite_id: ObjectId) -> DaoResult<()> {
        let mut session = self.txn.begin().await?;
        let result = async {
            self.store.invites.delete(&mut session, invite_id).await?;
            self.store
                .audit
                .append(
                    &mut session,
                    AuditTarget::new(ctx.workspace_id, ResourceType::Invite, invite_id),
                    AuditAction::Deleted,
                    ctx.user_id,
                    "Invite rolled back after email delivery failure",
                )
                .await
        }
        .await;
        self.txn.settle(session, result).await
    }

    pub async fn accept(
        &self,
        actor: &Identity,
        workspace_id: ObjectId,
        plain_token: &str,
    ) -> DaoResult<Outcome<WorkspaceMember>> {
        let digest = token::hash(plain_token.trim());

        let mut session = self.txn.begin().await?;
        let result = self.accept_in(&mut session, actor, workspace_id, &digest).await;
        let member = self.txn.settle(session, result).await?;

        info!(%workspace_id, user_id = %actor.user_id, role = %member.role, "Invite accepted");
        Ok(Outcome::ok("Invite accepted successfully", member))
    }

    async fn accept_in(
        &self,
        session: &mut ClientSession,
        actor: &Identity,
        workspace_id: ObjectId,
        digest: &str,
    ) -> DaoResult<WorkspaceMember> {
        // The conditional flip is the single point of truth for who wins a
        // concurrent acceptance; losers see no match or a write conflict.
        let invite = self
            .store
            .invites
            .consume(session, workspace_id, digest)
            .await?
            .ok_or_else(|| DaoError::not_found(INVALID_TOKEN))?;
        let invite_id = invite
            .id
            .ok_or_else(|| DaoError::validation("Invite has no id"))?;

        let user = self.store.users.find_by_id(actor.user_id).await?;
        if !user.is_email_verified || !user.email.eq_ignore_ascii_case(&invite.email) {
            return Err(DaoError::forbidden(
                "This invite was issued to a different email address",
            ));
        }

        let member = self
            .store
            .memberships
            .create(session, actor.user_id, workspace_id, invite.role, Some(invite.invited_by))
            .await?;
        if !self
            .store
            .workspaces
            .claim_member_slot(session, workspace_id)
            .await?
        {
            return Err(DaoError::conflict("The workspace has reached its member limit"));
        }

        self.store
            .audit
            .append(
                session,
                AuditTarget::new(workspace_id, ResourceType::Invite, invite_id),
                AuditAction::Accepted,
                actor.user_id,
                format!("{} joined as {}", user.username, member.role),
            )
            .await?;
        Ok(member)
    }

    pub async fn decline(
        &self,
        actor: &Identity,
        invite_id: ObjectId,
    ) -> DaoResult<Outcome<WorkspaceInvite>> {
        let email = actor.email.to_lowercase();
        let mut session = self.txn.begin().await?;
        let result = async {
            let invite = self
                .store
                .invites
                .decline(&mut session, invite_id, &email)
                .await?
                .ok_or_else(|| DaoError::not_found("Invite not found"))?;
            self.store
                .audit
                .append(
                    &mut session,
                    AuditTarget::new(invite.workspace_id, ResourceType::Invite, invite_id),
                    AuditAction::Declined,
                    actor.user_id,
                    format!("{} declined the invite", actor.username),
                )
                .await?;
            Ok::<_, DaoError>(invite)
        }
        .await;
        let invite = self.txn.settle(session, result).await?;
        Ok(Outcome::ok("Invite declined", invite))
    }

    /// Owner-only. Pending invites past expiry are reported as expired even
    /// if the janitor has not rewritten them yet.
    pub async fn list_for_workspace(
        &self,
        ctx: &ActorContext,
        pagination: Pagination,
    ) -> DaoResult<Outcome<PaginatedResult<WorkspaceInvite>>> {
        let workspace = self.store.workspaces.find_by_id(ctx.workspace_id).await?;
        if !permissions::can_manage_workspace(&ctx.user_id, &workspace.owner_id) {
            return Err(DaoError::forbidden("Only the workspace owner can view invites"));
        }

        let now = DateTime::now();
        let page = self
            .store
            .invites
            .list_for_workspace(ctx.workspace_id, pagination)
            .await?
            .map(|mut invite| {
                invite.status = invite.effective_status(now);
                invite
            });
        Ok(Outcome::ok("Invites retrieved successfully", page))
    }

    pub async fn list_for_user(
        &self,
        actor: &Identity,
        pagination: Pagination,
    ) -> DaoResult<Outcome<PaginatedResult<WorkspaceInvite>>> {
        let page = self
            .store
            .invites
            .list_active_for_email(&actor.email.to_lowercase(), pagination)
            .await?;
        Ok(Outcome::ok("Invites retrieved successfully", page))
    }

    pub async fn expire_stale(&self) -> DaoResult<u64> {
        self.store.invites.expire_stale().await.inspect_err(|e| {
            warn!(%e, "Invite expiry sweep failed");
        })
    }
}
