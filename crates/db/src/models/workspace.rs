use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub icon: Option<String>,
    pub owner_id: ObjectId,
    #[serde(default)]
    pub settings: WorkspaceSettings,
    #[serde(default)]
    pub projects_count: u32,
    #[serde(default = "default_members_count")]
    pub members_count: u32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "bool_true")]
    pub notify_owner_on_member_join: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub require_approval: bool,
    #[serde(default = "default_max_members")]
    pub max_members: u32,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            notify_owner_on_member_join: true,
            visibility: Visibility::default(),
            require_approval: false,
            max_members: default_max_members(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Shared by workspaces and projects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }
}

pub const MAX_MEMBERS_CEILING: u32 = 100;

fn default_max_members() -> u32 {
    50
}

fn default_members_count() -> u32 {
    1
}

fn bool_true() -> bool {
    true
}

impl Workspace {
    pub const COLLECTION: &'static str = "workspaces";
}
