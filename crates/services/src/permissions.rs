//! Role and visibility predicates. Pure functions over already-loaded facts;
//! callers fetch the authoritative record first and turn `false` into an
//! authorization failure.
//!
//! Rules that compare two roles (an admin acting on the owner or another
//! admin) live in the coordinating services, not here.

use bson::oid::ObjectId;
use hive_db::models::{Role, Visibility};

pub fn can_manage_workspace(actor_id: &ObjectId, owner_id: &ObjectId) -> bool {
    actor_id == owner_id
}

pub fn can_create_project(role: Role) -> bool {
    role.is_owner_or_admin()
}

pub fn can_manage_project(actor_id: &ObjectId, role: Role, creator_id: &ObjectId) -> bool {
    role == Role::Owner || actor_id == creator_id
}

pub fn can_view_project(
    role: Role,
    actor_id: &ObjectId,
    visibility: Visibility,
    creator_id: &ObjectId,
    members: &[ObjectId],
) -> bool {
    visibility == Visibility::Public
        || role == Role::Owner
        || actor_id == creator_id
        || members.contains(actor_id)
}

/// Creating and reading tasks inside a project.
pub fn can_contribute_tasks(role: Role, is_project_member: bool) -> bool {
    match role {
        Role::Owner => true,
        Role::Viewer => false,
        Role::Admin | Role::Member => is_project_member,
    }
}

pub fn can_edit_task_content(role: Role, actor_id: &ObjectId, creator_id: &ObjectId) -> bool {
    role.is_owner_or_admin() || (role == Role::Member && actor_id == creator_id)
}

pub fn can_update_task_status(
    role: Role,
    actor_id: &ObjectId,
    creator_id: &ObjectId,
    assignees: &[ObjectId],
) -> bool {
    role.is_owner_or_admin() || actor_id == creator_id || assignees.contains(actor_id)
}

pub fn can_assign_tasks(role: Role) -> bool {
    role.is_owner_or_admin()
}

pub fn can_delete_task(role: Role, actor_id: &ObjectId, creator_id: &ObjectId) -> bool {
    role.is_owner_or_admin() || (role == Role::Member && actor_id == creator_id)
}
