use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::workspace::Visibility;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workspace_id: ObjectId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_by: ObjectId,
    /// Explicit member list; always a subset of the workspace's members.
    #[serde(default)]
    pub members: Vec<ObjectId>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub visibility: Visibility,
    pub start_date: Option<DateTime>,
    pub end_date: Option<DateTime>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub last_modified_at: Option<DateTime>,
    pub last_modified_by: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Active,
    OnHold,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl Project {
    pub const COLLECTION: &'static str = "projects";

    pub fn has_member(&self, user_id: &ObjectId) -> bool {
        self.members.contains(user_id)
    }
}
