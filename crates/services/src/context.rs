use bson::oid::ObjectId;
use hive_db::models::Role;

/// The authenticated caller, independent of any workspace.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: ObjectId,
    pub email: String,
    pub username: String,
}

/// The caller as seen from one workspace. Built by the boundary from the
/// membership directory and passed by value into every service call.
#[derive(Debug, Clone, Copy)]
pub struct ActorContext {
    pub user_id: ObjectId,
    pub workspace_id: ObjectId,
    pub role: Role,
    /// Whether the caller is on the addressed project's member list; false
    /// when no project is addressed.
    pub is_project_member: bool,
}

impl ActorContext {
    pub fn new(user_id: ObjectId, workspace_id: ObjectId, role: Role) -> Self {
        Self {
            user_id,
            workspace_id,
            role,
            is_project_member: false,
        }
    }

    pub fn with_project_membership(self, is_project_member: bool) -> Self {
        Self {
            is_project_member,
            ..self
        }
    }
}
