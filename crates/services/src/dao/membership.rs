use bson::{DateTime, Document, doc, oid::ObjectId};
use hive_db::models::{InviteRole, Role, WorkspaceMember};
use mongodb::{ClientSession, Database};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, Pagination};

const ALREADY_MEMBER: &str = "The user is already a member of this workspace";

/// Membership Directory: the authoritative (user, workspace) -> role map.
pub struct MembershipDao {
    pub base: BaseDao<WorkspaceMember>,
}

impl MembershipDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, WorkspaceMember::COLLECTION),
        }
    }

    pub async fn get(&self, user_id: ObjectId, workspace_id: ObjectId) -> DaoResult<Option<Role>> {
        Ok(self
            .base
            .find_one(doc! { "workspace_id": workspace_id, "user_id": user_id })
            .await?
            .map(|m| m.role))
    }

    pub async fn get_in(
        &self,
        session: &mut ClientSession,
        user_id: ObjectId,
        workspace_id: ObjectId,
    ) -> DaoResult<Option<Role>> {
        Ok(self
            .base
            .find_one_in(session, doc! { "workspace_id": workspace_id, "user_id": user_id })
            .await?
            .map(|m| m.role))
    }

    /// Admits a member through the invite path. The role type cannot express
    /// `owner`; owner rows come only from [`MembershipDao::create_owner`].
    pub async fn create(
        &self,
        session: &mut ClientSession,
        user_id: ObjectId,
        workspace_id: ObjectId,
        role: InviteRole,
        invited_by: Option<ObjectId>,
    ) -> DaoResult<WorkspaceMember> {
        self.insert(session, user_id, workspace_id, role.into(), invited_by)
            .await
    }

    pub(crate) async fn create_owner(
        &self,
        session: &mut ClientSession,
        user_id: ObjectId,
        workspace_id: ObjectId,
    ) -> DaoResult<WorkspaceMember> {
        self.insert(session, user_id, workspace_id, Role::Owner, None)
            .await
    }

    async fn insert(
        &self,
        session: &mut ClientSession,
        user_id: ObjectId,
        workspace_id: ObjectId,
        role: Role,
        invited_by: Option<ObjectId>,
    ) -> DaoResult<WorkspaceMember> {
        let now = DateTime::now();
        let mut member = WorkspaceMember {
            id: None,
            workspace_id,
            user_id,
            role,
            invited_by,
            joined_at: now,
            created_at: now,
            updated_at: now,
        };

        // The unique (workspace_id, user_id) index is the real guard; a
        // duplicate surfaces as a conflict.
        let id = self
            .base
            .insert_one_in(session, &member)
            .await
            .map_err(|e| e.on_duplicate(ALREADY_MEMBER))?;
        member.id = Some(id);
        Ok(member)
    }

    pub async fn exists_any(&self, filter: Document) -> DaoResult<bool> {
        self.base.exists(filter).await
    }

    pub async fn is_member(&self, user_id: ObjectId, workspace_id: ObjectId) -> DaoResult<bool> {
        self.exists_any(doc! { "workspace_id": workspace_id, "user_id": user_id })
            .await
    }

    pub async fn list_workspace_ids_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<ObjectId>> {
        self.base
            .distinct_ids("workspace_id", doc! { "user_id": user_id })
            .await
    }

    pub async fn list_members(
        &self,
        workspace_id: ObjectId,
        pagination: Pagination,
    ) -> DaoResult<PaginatedResult<WorkspaceMember>> {
        self.base
            .find_paginated(
                doc! { "workspace_id": workspace_id },
                Some(doc! { "joined_at": 1 }),
                pagination,
            )
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

    pub async fn require_member(
        &self,
        session: &mut ClientSession,
        user_id: ObjectId,
        workspace_id: ObjectId,
        msg: &str,
    ) -> DaoResult<Role> {
        self.get_in(session, user_id, workspace_id)
            .await?
            .ok_or_else(|| DaoError::not_found(msg))
    }
}
