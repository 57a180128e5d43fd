use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::now_iso;
use crate::models::{NewTagRequest, Tag, tag::DEFAULT_TAG_COLOR};

pub async fn fetch_tags(db: &SqlitePool, user_id: &str) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE user_id = ? ORDER BY name ASC")
        .bind(user_id)
        .fetch_all(db)
        .await
}

pub async fn insert_tag(
    db: &SqlitePool,
    user_id: &str,
    req: NewTagRequest,
) -> Result<Tag, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now_iso();
    let color = req
        .color
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());

    sqlx::query("INSERT INTO tags (id, user_id, name, color, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&id)
        .bind(user_id)
        .bind(&req.name)
        .bind(&color)
        .bind(&now)
        .execute(db)
        .await?;

    Ok(Tag {
        id,
        user_id: user_id.to_string(),
        name: req.name,
        color,
        created_at: now,
    })
}

/// Deletes a tag and detaches it from every task. Returns the number of
/// tasks it was attached to, or `None` if the tag does not belong to the
/// caller.
pub async fn delete_tag(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<u64>, sqlx::Error> {
    let mut tx = db.begin().await?;

    let owned = sqlx::query_scalar::<_, String>("SELECT id FROM tags WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if owned.is_none() {
        return Ok(None);
    }

    let affected = sqlx::query("DELETE FROM task_tags WHERE tag_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some(affected))
}
