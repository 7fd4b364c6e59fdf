use bson::{DateTime, Document, doc, oid::ObjectId};
use hive_db::models::{Workspace, WorkspaceSettings};
use mongodb::{ClientSession, Database};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, Pagination};

pub struct WorkspaceDao {
    pub base: BaseDao<Workspace>,
}

impl WorkspaceDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Workspace::COLLECTION),
        }
    }

    pub async fn insert(
        &self,
        session: &mut ClientSession,
        name: String,
        slug: String,
        description: String,
        icon: Option<String>,
        owner_id: ObjectId,
        settings: WorkspaceSettings,
    ) -> DaoResult<Workspace> {
        let now = DateTime::now();
        let mut workspace = Workspace {
            id: None,
            name,
            slug,
            description,
            icon,
            owner_id,
            settings,
            projects_count: 0,
            members_count: 1,
            created_at: now,
            updated_at: now,
        };

        let id = self
            .base
            .insert_one_in(session, &workspace)
            .await
            .map_err(|e| e.on_duplicate("A workspace with this name already exists"))?;
        workspace.id = Some(id);
        Ok(workspace)
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<Workspace> {
        self.base
            .find_by_id(id)
            .await?
            .ok_or_else(|| DaoError::not_found("Workspace not found"))
    }

    /// True when another workspace already uses `slug`.
    pub async fn slug_taken(&self, slug: &str, except: Option<ObjectId>) -> DaoResult<bool> {
        let mut filter = doc! { "slug": slug };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        self.base.exists(filter).await
    }

    pub async fn update(
        &self,
        session: &mut ClientSession,
        id: ObjectId,
        set: Document,
    ) -> DaoResult<()> {
        let matched = self
            .base
            .update_one_in(session, doc! { "_id": id }, doc! { "$set": set })
            .await
            .map_err(|e| e.on_duplicate("A workspace with this name already exists"))?;
        if !matched {
            return Err(DaoError::not_found("Workspace not found"));
        }
        Ok(())
    }

    pub async fn adjust_projects_count(
        &self,
        session: &mut ClientSession,
        id: ObjectId,
        delta: i32,
    ) -> DaoResult<()> {
        self.base
            .update_one_in(
                session,
                doc! { "_id": id },
                doc! { "$inc": { "projects_count": delta } },
            )
            .await?;
        Ok(())
    }

    /// Claims one member slot. Matches only while `members_count` is below the
    /// workspace's own `max_members`, so concurrent joins cannot overshoot.
    pub async fn claim_member_slot(
        &self,
        session: &mut ClientSession,
        id: ObjectId,
    ) -> DaoResult<bool> {
        self.base
            .update_one_in(
                session,
                doc! {
                    "_id": id,
                    "$expr": { "$lt": ["$members_count", "$settings.max_members"] },
                },
                doc! { "$inc": { "members_count": 1 } },
            )
            .await
    }

    pub async fn delete(&self, session: &mut ClientSession, id: ObjectId) -> DaoResult<bool> {
        self.base.delete_one_in(session, doc! { "_id": id }).await
    }

    pub async fn list_by_ids(
        &self,
        ids: Vec<ObjectId>,
        pagination: Pagination,
    ) -> DaoResult<PaginatedResult<Workspace>> {
        self.base
            .find_paginated(doc! { "_id": { "$in": ids } }, None, pagination)
            .await
    }
}
