use bson::{DateTime, oid::ObjectId};
use hive_db::models::{AuditAction, AuditLogEntry, ResourceType};
use mongodb::{ClientSession, Database};
use tracing::debug;

use super::base::{BaseDao, DaoResult};

/// Write-only sink for the workspace audit trail. Entries are appended with
/// the caller's session so they commit or roll back with the mutation; a
/// failed append propagates and aborts the enclosing transaction.
pub struct AuditRecorder {
    pub base: BaseDao<AuditLogEntry>,
}

/// Identifies what an audit entry is about.
#[derive(Debug, Clone, Copy)]
pub struct AuditTarget {
    pub workspace_id: ObjectId,
    pub resource_type: ResourceType,
    pub resource_id: ObjectId,
}

impl AuditTarget {
    pub fn new(workspace_id: ObjectId, resource_type: ResourceType, resource_id: ObjectId) -> Self {
        Self {
            workspace_id,
            resource_type,
            resource_id,
        }
    }
}

impl AuditRecorder {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, AuditLogEntry::COLLECTION),
        }
    }

    pub async fn append(
        &self,
        session: &mut ClientSession,
        target: AuditTarget,
        action: AuditAction,
        performed_by: ObjectId,
        description: impl Into<String>,
    ) -> DaoResult<()> {
        let entry = AuditLogEntry {
            id: None,
            workspace_id: target.workspace_id,
            resource_type: target.resource_type,
            resource_id: target.resource_id,
            action,
            performed_by,
            timestamp: DateTime::now(),
            description: description.into(),
        };

        self.base.insert_one_in(session, &entry).await?;
        debug!(
            workspace_id = %target.workspace_id,
            resource_type = ?target.resource_type,
            resource_id = %target.resource_id,
            ?action,
            "Audit entry appended"
        );
        Ok(())
    }
}
