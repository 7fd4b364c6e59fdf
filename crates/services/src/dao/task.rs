use std::collections::HashSet;

use bson::{Document, doc, oid::ObjectId};
use hive_db::models::{Role, Task, TaskPriority, TaskStatus};
use mongodb::{ClientSession, Database};
use serde::Deserialize;

use super::base::{
    BaseDao, DaoError, DaoResult, PaginatedResult, Pagination, and_all, search_clause,
};

const SLUG_TAKEN: &str = "A task with this title already exists in this project";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListQuery {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

/// Builds the task listing filter for one project. The owner sees every
/// task; everyone else sees tasks they created or are assigned to.
pub fn list_filter(
    workspace_id: ObjectId,
    project_id: ObjectId,
    actor_id: ObjectId,
    role: Role,
    query: &TaskListQuery,
) -> Document {
    let mut base = doc! { "workspace_id": workspace_id, "project_id": project_id };
    if let Some(status) = query.status {
        base.insert("status", status.as_str());
    }
    if let Some(priority) = query.priority {
        base.insert("priority", priority.as_str());
    }

    let mut clauses = Vec::new();
    if let Some(search) = search_clause(query.search.as_deref(), &["title", "description"]) {
        clauses.push(search);
    }
    if role != Role::Owner {
        clauses.push(doc! {
            "$or": [
                { "creator": actor_id },
                { "assignees": actor_id },
            ]
        });
    }
    and_all(base, clauses)
}

pub struct TaskDao {
    pub base: BaseDao<Task>,
}

impl TaskDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Task::COLLECTION),
        }
    }

    pub async fn insert(&self, session: &mut ClientSession, mut task: Task) -> DaoResult<Task> {
        let id = self
            .base
            .insert_one_in(session, &task)
            .await
            .map_err(|e| e.on_duplicate(SLUG_TAKEN))?;
        task.id = Some(id);
        Ok(task)
    }

    pub async fn find_in_project(
        &self,
        workspace_id: ObjectId,
        project_id: ObjectId,
        task_id: ObjectId,
    ) -> DaoResult<Task> {
        self.base
            .find_one(doc! {
                "_id": task_id,
                "workspace_id": workspace_id,
                "project_id": project_id,
            })
            .await?
            .ok_or_else(|| DaoError::not_found("Task not found"))
    }

    pub async fn find_in_project_in(
        &self,
        session: &mut ClientSession,
        workspace_id: ObjectId,
        project_id: ObjectId,
        task_id: ObjectId,
    ) -> DaoResult<Task> {
        self.base
            .find_one_in(
                session,
                doc! {
                    "_id": task_id,
                    "workspace_id": workspace_id,
                    "project_id": project_id,
                },
            )
            .await?
            .ok_or_else(|| DaoError::not_found("Task not found"))
    }

    pub async fn slug_taken(
        &self,
        workspace_id: ObjectId,
        project_id: ObjectId,
        slug: &str,
        except: Option<ObjectId>,
    ) -> DaoResult<bool> {
        let mut filter = doc! {
            "workspace_id": workspace_id,
            "project_id": project_id,
            "slug": slug,
        };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        self.base.exists(filter).await
    }

    pub async fn update(
        &self,
        session: &mut ClientSession,
        task_id: ObjectId,
        update: Document,
    ) -> DaoResult<()> {
        let matched = self
            .base
            .update_one_in(session, doc! { "_id": task_id }, update)
            .await
            .map_err(|e| e.on_duplicate(SLUG_TAKEN))?;
        if !matched {
            return Err(DaoError::not_found("Task not found"));
        }
        Ok(())
    }

    pub async fn push_subtask(
        &self,
        session: &mut ClientSession,
        parent_id: ObjectId,
        child_id: ObjectId,
    ) -> DaoResult<()> {
        self.base
            .update_one_in(
                session,
                doc! { "_id": parent_id },
                doc! { "$addToSet": { "subtasks": child_id } },
            )
            .await?;
        Ok(())
    }

    pub async fn pull_subtask(
        &self,
        session: &mut ClientSession,
        parent_id: ObjectId,
        child_id: ObjectId,
    ) -> DaoResult<()> {
        self.base
            .update_one_in(
                session,
                doc! { "_id": parent_id },
                doc! { "$pull": { "subtasks": child_id } },
            )
            .await?;
        Ok(())
    }

    /// True when `task_id` appears on the parent chain starting at
    /// `candidate_parent` (or is the candidate itself).
    pub async fn is_ancestor_or_self(
        &self,
        session: &mut ClientSession,
        task_id: ObjectId,
        candidate_parent: ObjectId,
    ) -> DaoResult<bool> {
        let mut seen = HashSet::new();
        let mut cursor = Some(candidate_parent);
        while let Some(current) = cursor {
            if current == task_id {
                return Ok(true);
            }
            // A pre-existing loop in stored data must not spin forever.
            if !seen.insert(current) {
                return Ok(true);
            }
            cursor = self
                .base
                .find_one_in(session, doc! { "_id": current })
                .await?
                .and_then(|t| t.parent_task);
        }
        Ok(false)
    }

    pub async fn count_for_project(
        &self,
        session: &mut ClientSession,
        project_id: ObjectId,
    ) -> DaoResult<u64> {
        self.base
            .count_in(session, doc! { "project_id": project_id })
            .await
    }

    /// Adds `user_id` to the assignees; false when already assigned.
    pub async fn add_assignee(
        &self,
        session: &mut ClientSession,
        task_id: ObjectId,
        user_id: ObjectId,
        stamp: Document,
    ) -> DaoResult<bool> {
        let mut set = stamp;
        set.insert("is_personal", false);
        self.base
            .update_one_in(
                session,
                doc! { "_id": task_id, "assignees": { "$ne": user_id } },
                doc! { "$push": { "assignees": user_id }, "$set": set },
            )
            .await
    }

    /// Removes `user_id` from the assignees; false when not assigned.
    pub async fn remove_assignee(
        &self,
        session: &mut ClientSession,
        task_id: ObjectId,
        user_id: ObjectId,
        now_personal: bool,
        stamp: Document,
    ) -> DaoResult<bool> {
        let mut set = stamp;
        set.insert("is_personal", now_personal);
        self.base
            .update_one_in(
                session,
                doc! { "_id": task_id, "assignees": user_id },
                doc! { "$pull": { "assignees": user_id }, "$set": set },
            )
            .await
    }

    /// Drops `user_id` from every task of one project, stamping each touched
    /// task with `stamp`; tasks left with no assignee become personal again.
    pub async fn unassign_in_project(
        &self,
        session: &mut ClientSession,
        project_id: ObjectId,
        user_id: ObjectId,
        stamp: Document,
    ) -> DaoResult<u64> {
        let unassigned = self
            .base
            .update_many_in(
                session,
                doc! { "project_id": project_id, "assignees": user_id },
                doc! { "$pull": { "assignees": user_id }, "$set": stamp },
            )
            .await?;
        if unassigned > 0 {
            self.base
                .update_many_in(
                    session,
                    doc! {
                        "project_id": project_id,
                        "assignees": { "$size": 0 },
                        "is_personal": false,
                    },
                    doc! { "$set": { "is_personal": true } },
                )
                .await?;
        }
        Ok(unassigned)
    }

    pub async fn delete(&self, session: &mut ClientSession, task_id: ObjectId) -> DaoResult<bool> {
        self.base
            .delete_one_in(session, doc! { "_id": task_id })
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
    ) -> DaoResult<PaginatedResult<Task>> {
        self.base.find_paginated(filter, None, pagination).await
    }
}
