use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::models::Tag;

/// Legacy display priority. Matrix placement is derived from the
/// urgency/importance flags, never from this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub is_urgent: bool,
    pub is_important: bool,
    pub is_prioritized: bool,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub time_spent: i64,
    pub pomodoro_count: i64,
    pub is_daily_highlight: bool,
    pub highlight_date: Option<String>,
    pub is_frog: bool,
    pub display_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskWithTags {
    #[serde(flatten)]
    pub task: Task,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub is_urgent: Option<bool>,
    pub is_important: Option<bool>,
    pub is_prioritized: Option<bool>,
    pub tag_ids: Option<Vec<String>>,
}

/// Partial update. Plain `Option` fields distinguish "absent" from
/// "present"; double-`Option` fields additionally distinguish "set to
/// null" so a clear is never conflated with "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub is_urgent: Option<bool>,
    pub is_important: Option<bool>,
    pub is_prioritized: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub scheduled_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub estimated_minutes: Option<Option<i64>>,
    pub display_order: Option<i64>,
    pub tag_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    pub id: String,
    #[serde(alias = "display_order")]
    pub display_order: i64,
}

fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}
