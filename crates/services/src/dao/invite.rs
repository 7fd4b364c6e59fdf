use bson::{DateTime, Document, doc, oid::ObjectId};
use hive_db::models::{InviteRole, InviteStatus, WorkspaceInvite};
use mongodb::{ClientSession, Database, options::ReturnDocument};
use tracing::info;

use super::base::{BaseDao, DaoResult, PaginatedResult, Pagination};

pub struct InviteDao {
    pub base: BaseDao<WorkspaceInvite>,
}

/// Matches invites that can still be accepted at `now`.
fn active_filter(now: DateTime) -> Document {
    doc! {
        "status": InviteStatus::Pending.as_str(),
        "token_expires_at": { "$gt": now },
    }
}

/// Matches pending invites whose token has lapsed at `now`.
fn stale_filter(now: DateTime) -> Document {
    doc! {
        "status": InviteStatus::Pending.as_str(),
        "token_expires_at": { "$lte": now },
    }
}

fn expire_update() -> Document {
    doc! {
        "$set": {
            "status": InviteStatus::Expired.as_str(),
            "token": null,
        }
    }
}

impl InviteDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, WorkspaceInvite::COLLECTION),
        }
    }

    pub async fn insert(
        &self,
        session: &mut ClientSession,
        workspace_id: ObjectId,
        invited_by: ObjectId,
        email: String,
        role: InviteRole,
        token_hash: String,
        expires_at: DateTime,
    ) -> DaoResult<WorkspaceInvite> {
        let now = DateTime::now();
        let mut invite = WorkspaceInvite {
            id: None,
            workspace_id,
            invited_by,
            role,
            email,
            token: Some(token_hash),
            token_expires_at: Some(expires_at),
            status: InviteStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let id = self.base.insert_one_in(session, &invite).await?;
        invite.id = Some(id);
        Ok(invite)
    }

    pub async fn has_active(&self, workspace_id: ObjectId, email: &str) -> DaoResult<bool> {
        let mut filter = active_filter(DateTime::now());
        filter.insert("workspace_id", workspace_id);
        filter.insert("email", email);
        self.base.exists(filter).await
    }

    /// Atomically flips the active invite carrying `token_hash` to `accepted`
    /// and clears its token fields. Returns the pre-image, or `None` when no
    /// active invite matched; a `None` means the token was invalid, expired
    /// or already consumed by a concurrent acceptance.
    pub async fn consume(
        &self,
        session: &mut ClientSession,
        workspace_id: ObjectId,
        token_hash: &str,
    ) -> DaoResult<Option<WorkspaceInvite>> {
        let now = DateTime::now();
        let mut filter = active_filter(now);
        filter.insert("workspace_id", workspace_id);
        filter.insert("token", token_hash);

        Ok(self
            .base
            .collection()
            .find_one_and_update(
                filter,
                doc! {
                    "$set": {
                        "status": InviteStatus::Accepted.as_str(),
                        "token": null,
                        "token_expires_at": null,
                        "updated_at": now,
                    }
                },
            )
            .return_document(ReturnDocument::Before)
            .session(&mut *session)
            .await?)
    }

    /// Moves an active invite addressed to `email` to `declined`.
    pub async fn decline(
        &self,
        session: &mut ClientSession,
        invite_id: ObjectId,
        email: &str,
    ) -> DaoResult<Option<WorkspaceInvite>> {
        let now = DateTime::now();
        let mut filter = active_filter(now);
        filter.insert("_id", invite_id);
        filter.insert("email", email);

        Ok(self
            .base
            .collection()
            .find_one_and_update(
                filter,
                doc! {
                    "$set": {
                        "status": InviteStatus::Declined.as_str(),
                        "token": null,
                        "token_expires_at": null,
                        "updated_at": now,
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await?)
    }

    pub async fn list_for_workspace(
        &self,
        workspace_id: ObjectId,
        pagination: Pagination,
    ) -> DaoResult<PaginatedResult<WorkspaceInvite>> {
        self.base
            .find_paginated(doc! { "workspace_id": workspace_id }, None, pagination)
            .await
    }

    pub async fn list_active_for_email(
        &self,
        email: &str,
        pagination: Pagination,
    ) -> DaoResult<PaginatedResult<WorkspaceInvite>> {
        let mut filter = active_filter(DateTime::now());
        filter.insert("email", email);
        self.base.find_paginated(filter, None, pagination).await
    }

    /// Housekeeping only; acceptance never relies on this having run.
    pub async fn expire_stale(&self) -> DaoResult<u64> {
        let expired = self
            .base
            .update_many(stale_filter(DateTime::now()), expire_update())
            .await?;
        if expired > 0 {
            info!(expired, "Marked stale invites as expired");
        }
        Ok(expired)
    }

    /// Expires pending invites for the pair whose token has lapsed, so they
    /// no longer hold the one-pending-invite index slot.
    pub async fn expire_stale_for(
        &self,
        session: &mut ClientSession,
        workspace_id: ObjectId,
        email: &str,
    ) -> DaoResult<u64> {
        let mut filter = stale_filter(DateTime::now());
        filter.insert("workspace_id", workspace_id);
        filter.insert("email", email);
        self.base
            .update_many_in(session, filter, expire_update())
            .await
    }

    pub async fn delete(&self, session: &mut ClientSession, invite_id: ObjectId) -> DaoResult<bool> {
        self.base
            .delete_one_in(session, doc! { "_id": invite_id })
            .await
    }

    pub async fn delete_for_workspace(
        &self,
        session: &mut ClientSession,
        workspace_id: ObjectId,
    ) -> DaoResult<u64> {
        self.base
            .delete_many_in(session, doc! { "workspace_id": workspace_id })
            .await
    }
}
