use bson::{Document, doc, oid::ObjectId};
use hive_db::models::{Project, ProjectStatus, Role, Visibility};
use mongodb::{ClientSession, Database};
use serde::Deserialize;

use super::base::{
    BaseDao, DaoError, DaoResult, PaginatedResult, Pagination, and_all, search_clause,
};

const SLUG_TAKEN: &str = "A project with this name already exists";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListQuery {
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
    pub visibility: Option<Visibility>,
}

/// Builds the project listing filter for `actor`. The owner sees every
/// project; everyone else sees public projects, projects they created and
/// projects they are a member of.
pub fn list_filter(
    workspace_id: ObjectId,
    actor_id: ObjectId,
    role: Role,
    query: &ProjectListQuery,
) -> Document {
    let mut base = doc! { "workspace_id": workspace_id };
    if let Some(status) = query.status {
        base.insert("status", status.as_str());
    }
    if let Some(visibility) = query.visibility {
        base.insert("visibility", visibility.as_str());
    }

    let mut clauses = Vec::new();
    if let Some(search) = search_clause(query.search.as_deref(), &["name", "description"]) {
        clauses.push(search);
    }
    if role != Role::Owner {
        clauses.push(doc! {
            "$or": [
                { "visibility": Visibility::Public.as_str() },
                { "created_by": actor_id },
                { "members": actor_id },
            ]
        });
    }
    and_all(base, clauses)
}

pub struct ProjectDao {
    pub base: BaseDao<Project>,
}

impl ProjectDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Project::COLLECTION),
        }
    }

    pub async fn insert(&self, session: &mut ClientSession, mut project: Project) -> DaoResult<Project> {
        let id = self
            .base
            .insert_one_in(session, &project)
            .await
            .map_err(|e| e.on_duplicate(SLUG_TAKEN))?;
        project.id = Some(id);
        Ok(project)
    }

    pub async fn find_in_workspace(
        &self,
        workspace_id: ObjectId,
        project_id: ObjectId,
    ) -> DaoResult<Project> {
        self.base
            .find_one(doc! { "_id": project_id, "workspace_id": workspace_id })
            .await?
            .ok_or_else(|| DaoError::not_found("Project not found"))
    }

    pub async fn slug_taken(&self, slug: &str, except: Option<ObjectId>) -> DaoResult<bool> {
        let mut filter = doc! { "slug": slug };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        self.base.exists(filter).await
    }

    pub async fn is_member(&self, project_id: ObjectId, user_id: ObjectId) -> DaoResult<bool> {
        self.base
            .exists(doc! { "_id": project_id, "members": user_id })
            .await
    }

    pub async fn update(
        &self,
        session: &mut ClientSession,
        project_id: ObjectId,
        set: Document,
    ) -> DaoResult<()> {
        let matched = self
            .base
            .update_one_in(session, doc! { "_id": project_id }, doc! { "$set": set })
            .await
            .map_err(|e| e.on_duplicate(SLUG_TAKEN))?;
        if !matched {
            return Err(DaoError::not_found("Project not found"));
        }
        Ok(())
    }

    /// Adds `user_id` to the member list; false when already present.
    pub async fn add_member(
        &self,
        session: &mut ClientSession,
        project_id: ObjectId,
        user_id: ObjectId,
        stamp: Document,
    ) -> DaoResult<bool> {
        self.base
            .update_one_in(
                session,
                doc! { "_id": project_id, "members": { "$ne": user_id } },
                doc! { "$push": { "members": user_id }, "$set": stamp },
            )
            .await
    }

    /// Removes `user_id` from the member list; false when absent.
    pub async fn remove_member(
        &self,
        session: &mut ClientSession,
        project_id: ObjectId,
        user_id: ObjectId,
        stamp: Document,
    ) -> DaoResult<bool> {
        self.base
            .update_one_in(
                session,
                doc! { "_id": project_id, "members": user_id },
                doc! { "$pull": { "members": user_id }, "$set": stamp },
            )
            .await
    }

    pub async fn delete(&self, session: &mut ClientSession, project_id: ObjectId) -> DaoResult<bool> {
        self.base
            .delete_one_in(session, doc! { "_id": project_id })
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

    pub async fn list(
        &self,
        filter: Document,
        pagination: Pagination,
    ) -> DaoResult<PaginatedResult<Project>> {
        self.base.find_paginated(filter, None, pagination).await
    }
}
