use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{
    AuditLogEntry, Project, Task, User, Workspace, WorkspaceInvite, WorkspaceMember,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    info!("Ensuring MongoDB indexes...");

    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index_unique(bson::doc! { "username": 1 }),
            index(bson::doc! { "account_status": 1 }),
        ],
    )
    .await?;

    // Workspaces
    create_indexes(
        db,
        Workspace::COLLECTION,
        vec![
            index_unique(bson::doc! { "slug": 1 }),
            index(bson::doc! { "owner_id": 1 }),
        ],
    )
    .await?;

    // Memberships: one row per (workspace, user), one owner row per workspace
    create_indexes(
        db,
        WorkspaceMember::COLLECTION,
        vec![
            index_unique(bson::doc! { "workspace_id": 1, "user_id": 1 }),
            index(bson::doc! { "user_id": 1 }),
            IndexModel::builder()
                .keys(bson::doc! { "workspace_id": 1, "role": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(bson::doc! { "role": "owner" })
                        .name("one_owner_per_workspace".to_string())
                        .build(),
                )
                .build(),
        ],
    )
    .await?;

    // Invites
    create_indexes(
        db,
        WorkspaceInvite::COLLECTION,
        vec![
            IndexModel::builder()
                .keys(bson::doc! { "workspace_id": 1, "email": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(bson::doc! { "status": "pending" })
                        .name("one_pending_invite_per_email".to_string())
                        .build(),
                )
                .build(),
            index(bson::doc! { "workspace_id": 1, "email": 1, "status": 1 }),
            index(bson::doc! { "token": 1 }),
            index(bson::doc! { "status": 1, "token_expires_at": 1 }),
        ],
    )
    .await?;

    // Projects
    create_indexes(
        db,
        Project::COLLECTION,
        vec![
            index_unique(bson::doc! { "slug": 1 }),
            index(bson::doc! { "workspace_id": 1, "status": 1 }),
            index(bson::doc! { "members": 1 }),
        ],
    )
    .await?;

    // Tasks
    create_indexes(
        db,
        Task::COLLECTION,
        vec![
            index_unique(bson::doc! { "workspace_id": 1, "project_id": 1, "slug": 1 }),
            index(bson::doc! { "project_id": 1, "status": 1 }),
            index(bson::doc! { "assignees": 1 }),
            index(bson::doc! { "parent_task": 1 }),
        ],
    )
    .await?;

    // Audit log
    create_indexes(
        db,
        AuditLogEntry::COLLECTION,
        vec![
            index(bson::doc! { "workspace_id": 1, "timestamp": -1 }),
            index(bson::doc! { "resource_type": 1, "resource_id": 1 }),
            index(bson::doc! { "performed_by": 1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
