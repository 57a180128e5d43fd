use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_TAG_COLOR: &str = "#6366f1";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTagRequest {
    pub name: String,
    pub color: Option<String>,
}
