use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub workspace_id: ObjectId,
    pub project_id: ObjectId,
    pub title: String,
    /// Unique within (workspace, project).
    pub slug: String,
    pub description: Option<String>,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    /// True while nobody is assigned.
    #[serde(default = "bool_true")]
    pub is_personal: bool,
    #[serde(default)]
    pub assignees: Vec<ObjectId>,
    pub creator: ObjectId,
    /// Minutes.
    pub estimated_time: u32,
    pub actual_time: Option<u32>,
    pub due_date: DateTime,
    #[serde(default)]
    pub tags: Vec<String>,
    pub completed_at: Option<DateTime>,
    pub completed_by: Option<ObjectId>,
    pub parent_task: Option<ObjectId>,
    #[serde(default)]
    pub subtasks: Vec<ObjectId>,
    pub last_modified_at: Option<DateTime>,
    pub last_modified_by: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Feature,
    Bug,
    Documentation,
    Test,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
    Blocked,
    Archived,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Archived => "archived",
        }
    }
}

fn bool_true() -> bool {
    true
}

impl Task {
    pub const COLLECTION: &'static str = "tasks";

    pub fn is_assigned_to(&self, user_id: &ObjectId) -> bool {
        self.assignees.contains(user_id)
    }
}
