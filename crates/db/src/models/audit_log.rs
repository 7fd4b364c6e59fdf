use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Append-only record of a state-changing action inside a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workspace_id: ObjectId,
    pub resource_type: ResourceType,
    pub resource_id: ObjectId,
    pub action: AuditAction,
    pub performed_by: ObjectId,
    pub timestamp: DateTime,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Workspace,
    Project,
    Task,
    Invite,
    Membership,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    MemberAdded,
    MemberRemoved,
    Assigned,
    Unassigned,
    Accepted,
    Declined,
}

impl AuditLogEntry {
    pub const COLLECTION: &'static str = "workspace_audit_log";
}
