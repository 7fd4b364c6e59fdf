use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::workspace_member::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceInvite {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workspace_id: ObjectId,
    pub invited_by: ObjectId,
    pub role: InviteRole,
    pub email: String,
    /// SHA-256 of the emailed token; cleared once the invite leaves `pending`.
    pub token: Option<String>,
    pub token_expires_at: Option<DateTime>,
    #[serde(default)]
    pub status: InviteStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Roles an invite may grant. `owner` is deliberately absent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InviteRole {
    Admin,
    Member,
}

impl From<InviteRole> for Role {
    fn from(role: InviteRole) -> Self {
        match role {
            InviteRole::Admin => Role::Admin,
            InviteRole::Member => Role::Member,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Declined => "declined",
            InviteStatus::Expired => "expired",
        }
    }
}

impl WorkspaceInvite {
    pub const COLLECTION: &'static str = "workspace_invites";

    /// Status as observed at `now`: a pending invite past its expiry reads as
    /// expired even before the janitor has rewritten it.
    pub fn effective_status(&self, now: DateTime) -> InviteStatus {
        match (self.status, self.token_expires_at) {
            (InviteStatus::Pending, Some(expires)) if expires <= now => InviteStatus::Expired,
            (status, _) => status,
        }
    }
}
