use std::collections::HashMap;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::now_iso;
use crate::models::{NewTaskRequest, ReorderEntry, Tag, Task, TaskWithTags, UpdateTaskRequest};

#[derive(sqlx::FromRow)]
struct TaskTagRow {
    task_id: String,
    #[sqlx(flatten)]
    tag: Tag,
}

/// All tasks for the owner, each joined with its tag set. Manual order
/// first, newest first within the same slot.
pub async fn fetch_tasks(db: &SqlitePool, user_id: &str) -> Result<Vec<TaskWithTags>, sqlx::Error> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE user_id = ? ORDER BY display_order ASC, created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let rows = sqlx::query_as::<_, TaskTagRow>(
        "SELECT tt.task_id, tg.id, tg.user_id, tg.name, tg.color, tg.created_at
         FROM task_tags tt
         JOIN tags tg ON tg.id = tt.tag_id
         JOIN tasks t ON t.id = tt.task_id
         WHERE t.user_id = ?
         ORDER BY tg.name ASC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let mut by_task: HashMap<String, Vec<Tag>> = HashMap::new();
    for row in rows {
        by_task.entry(row.task_id).or_default().push(row.tag);
    }

    Ok(tasks
        .into_iter()
        .map(|task| {
            let tags = by_task.remove(&task.id).unwrap_or_default();
            TaskWithTags { task, tags }
        })
        .collect())
}

pub async fn fetch_task(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<TaskWithTags>, sqlx::Error> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    let Some(task) = task else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, TaskTagRow>(
        "SELECT tt.task_id, tg.id, tg.user_id, tg.name, tg.color, tg.created_at
         FROM task_tags tt
         JOIN tags tg ON tg.id = tt.tag_id
         WHERE tt.task_id = ?
         ORDER BY tg.name ASC",
    )
    .bind(&task.id)
    .fetch_all(db)
    .await?;

    Ok(Some(TaskWithTags {
        task,
        tags: rows.into_iter().map(|r| r.tag).collect(),
    }))
}

pub async fn insert_task(
    db: &SqlitePool,
    user_id: &str,
    req: NewTaskRequest,
) -> Result<TaskWithTags, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now_iso();
    let priority = req.priority.unwrap_or_default();

    let mut tx = db.begin().await?;

    sqlx::query(
        "INSERT INTO tasks
            (id, user_id, title, description, completed, priority,
             is_urgent, is_important, is_prioritized,
             scheduled_date, scheduled_time, estimated_minutes,
             time_spent, pomodoro_count,
             is_daily_highlight, highlight_date, is_frog,
             display_order, created_at, updated_at)
         VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, NULL, 0, 0, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(priority)
    .bind(req.is_urgent.unwrap_or(false))
    .bind(req.is_important.unwrap_or(false))
    .bind(req.is_prioritized.unwrap_or(false))
    .bind(&req.scheduled_date)
    .bind(&req.scheduled_time)
    .bind(req.estimated_minutes)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    if let Some(tag_ids) = &req.tag_ids {
        for tag_id in tag_ids {
            // Ownership embedded in the insert: a foreign tag id inserts nothing.
            sqlx::query(
                "INSERT OR IGNORE INTO task_tags (task_id, tag_id)
                 SELECT ?, id FROM tags WHERE id = ? AND user_id = ?",
            )
            .bind(&id)
            .bind(tag_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    fetch_task(db, user_id, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Partial update: only supplied fields change. A `scheduled_date` that
/// resolves to null or an empty string clears the date AND forces
/// `is_prioritized` off in the same update, returning the task to the
/// backlog. A supplied `tag_ids` (even empty) replaces the whole
/// association set.
pub async fn update_task(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
    req: UpdateTaskRequest,
) -> Result<Option<TaskWithTags>, sqlx::Error> {
    let mut tx = db.begin().await?;

    let mut current = match sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    {
        Some(t) => t,
        None => return Ok(None),
    };

    if let Some(title) = req.title {
        current.title = title;
    }
    if let Some(description) = req.description {
        current.description = description;
    }
    if let Some(completed) = req.completed {
        current.completed = completed;
    }
    if let Some(priority) = req.priority {
        current.priority = priority;
    }
    if let Some(is_urgent) = req.is_urgent {
        current.is_urgent = is_urgent;
    }
    if let Some(is_important) = req.is_important {
        current.is_important = is_important;
    }
    if let Some(is_prioritized) = req.is_prioritized {
        current.is_prioritized = is_prioritized;
    }
    if let Some(scheduled_time) = req.scheduled_time {
        current.scheduled_time = scheduled_time;
    }
    if let Some(estimated_minutes) = req.estimated_minutes {
        current.estimated_minutes = estimated_minutes;
    }
    if let Some(display_order) = req.display_order {
        current.display_order = display_order;
    }
    // The client sends "" interchangeably with null for a cleared date;
    // both drop the task back to the backlog.
    if let Some(scheduled_date) = req.scheduled_date {
        match scheduled_date.filter(|d| !d.is_empty()) {
            Some(date) => current.scheduled_date = Some(date),
            None => {
                current.scheduled_date = None;
                current.is_prioritized = false;
            }
        }
    }
    current.updated_at = now_iso();

    sqlx::query(
        "UPDATE tasks
         SET title = ?, description = ?, completed = ?, priority = ?,
             is_urgent = ?, is_important = ?, is_prioritized = ?,
             scheduled_date = ?, scheduled_time = ?, estimated_minutes = ?,
             display_order = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(current.completed)
    .bind(current.priority)
    .bind(current.is_urgent)
    .bind(current.is_important)
    .bind(current.is_prioritized)
    .bind(&current.scheduled_date)
    .bind(&current.scheduled_time)
    .bind(current.estimated_minutes)
    .bind(current.display_order)
    .bind(&current.updated_at)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(tag_ids) = &req.tag_ids {
        sqlx::query("DELETE FROM task_tags WHERE task_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for tag_id in tag_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO task_tags (task_id, tag_id)
                 SELECT ?, id FROM tags WHERE id = ? AND user_id = ?",
            )
            .bind(id)
            .bind(tag_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    fetch_task(db, user_id, id).await
}

/// Hard delete, cascading tag associations and pomodoro sessions.
pub async fn delete_task(db: &SqlitePool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let deleted = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Ok(false);
    }

    sqlx::query("DELETE FROM task_tags WHERE task_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM pomodoro_sessions WHERE task_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(true)
}

/// Applies every ordering as one atomic set. Entries for ids the caller
/// does not own match zero rows and are skipped, not rejected.
pub async fn reorder_tasks(
    db: &SqlitePool,
    user_id: &str,
    orderings: &[ReorderEntry],
) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;
    let now = now_iso();

    for entry in orderings {
        sqlx::query(
            "UPDATE tasks SET display_order = ?, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(entry.display_order)
        .bind(&now)
        .bind(&entry.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testutil::{seed_user, setup_pool};
    use crate::models::{NewTagRequest, Priority};

    fn new_task(title: &str) -> NewTaskRequest {
        NewTaskRequest {
            title: title.to_string(),
            description: None,
            priority: None,
            scheduled_date: None,
            scheduled_time: None,
            estimated_minutes: None,
            is_urgent: None,
            is_important: None,
            is_prioritized: None,
            tag_ids: None,
        }
    }

    #[tokio::test]
    async fn test_insert_task_defaults() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store@example.com").await;

        let created = insert_task(&pool, &user, new_task("Write report"))
            .await
            .expect("Failed to insert task");

        assert_eq!(created.task.title, "Write report");
        assert_eq!(created.task.priority, Priority::Medium);
        assert!(!created.task.completed);
        assert!(!created.task.is_prioritized);
        assert!(!created.task.is_daily_highlight);
        assert!(!created.task.is_frog);
        assert_eq!(created.task.time_spent, 0);
        assert_eq!(created.task.pomodoro_count, 0);
        assert!(created.tags.is_empty());
    }

    #[tokio::test]
    async fn test_time_without_date_is_stored_unvalidated() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store1b@example.com").await;

        // Meaningless but accepted: a time with no date is kept as-is.
        let mut req = new_task("floating time");
        req.scheduled_time = Some("09:30".to_string());
        let created = insert_task(&pool, &user, req).await.unwrap();
        assert_eq!(created.task.scheduled_time.as_deref(), Some("09:30"));
        assert!(created.task.scheduled_date.is_none());
    }

    #[tokio::test]
    async fn test_insert_task_with_tags() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store2@example.com").await;

        let tag = crate::db::tags::insert_tag(
            &pool,
            &user,
            NewTagRequest {
                name: "focus".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();

        let mut req = new_task("Tagged");
        req.tag_ids = Some(vec![tag.id.clone(), "no-such-tag".to_string()]);
        let created = insert_task(&pool, &user, req).await.unwrap();

        assert_eq!(created.tags.len(), 1);
        assert_eq!(created.tags[0].id, tag.id);
    }

    #[tokio::test]
    async fn test_update_task_partial_leaves_omitted_fields() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store3@example.com").await;

        let mut req = new_task("Original");
        req.description = Some("keep me".to_string());
        let created = insert_task(&pool, &user, req).await.unwrap();

        let updated = update_task(
            &pool,
            &user,
            &created.task.id,
            UpdateTaskRequest {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("Task not found");

        assert_eq!(updated.task.title, "Renamed");
        assert_eq!(updated.task.description.as_deref(), Some("keep me"));
    }

    #[tokio::test]
    async fn test_clearing_scheduled_date_forces_unprioritized() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store4@example.com").await;

        let mut req = new_task("Scheduled");
        req.scheduled_date = Some("2024-06-01".to_string());
        req.is_prioritized = Some(true);
        let created = insert_task(&pool, &user, req).await.unwrap();
        assert!(created.task.is_prioritized);

        let updated = update_task(
            &pool,
            &user,
            &created.task.id,
            UpdateTaskRequest {
                scheduled_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert!(updated.task.scheduled_date.is_none());
        assert!(!updated.task.is_prioritized);
    }

    #[tokio::test]
    async fn test_empty_string_scheduled_date_clears_like_null() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store5@example.com").await;

        let mut req = new_task("Scheduled");
        req.scheduled_date = Some("2024-06-01".to_string());
        req.is_prioritized = Some(true);
        let created = insert_task(&pool, &user, req).await.unwrap();

        // The client conflates "" and null for a cleared date; both must
        // drop the task back to the backlog.
        let updated = update_task(
            &pool,
            &user,
            &created.task.id,
            UpdateTaskRequest {
                scheduled_date: Some(Some(String::new())),
                is_prioritized: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert!(updated.task.scheduled_date.is_none());
        assert!(!updated.task.is_prioritized);
    }

    #[tokio::test]
    async fn test_update_replaces_tag_set() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store6@example.com").await;

        let tag_a = crate::db::tags::insert_tag(
            &pool,
            &user,
            NewTagRequest {
                name: "a".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();
        let tag_b = crate::db::tags::insert_tag(
            &pool,
            &user,
            NewTagRequest {
                name: "b".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();

        let mut req = new_task("Tagged");
        req.tag_ids = Some(vec![tag_a.id.clone()]);
        let created = insert_task(&pool, &user, req).await.unwrap();

        let updated = update_task(
            &pool,
            &user,
            &created.task.id,
            UpdateTaskRequest {
                tag_ids: Some(vec![tag_b.id.clone()]),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].id, tag_b.id);

        // An explicit empty list clears every association.
        let cleared = update_task(
            &pool,
            &user,
            &created.task.id,
            UpdateTaskRequest {
                tag_ids: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert!(cleared.tags.is_empty());
    }

    #[tokio::test]
    async fn test_update_foreign_owner_is_none() {
        let pool = setup_pool().await;
        let alice = seed_user(&pool, "alice2@example.com").await;
        let bob = seed_user(&pool, "bob2@example.com").await;

        let created = insert_task(&pool, &alice, new_task("Private")).await.unwrap();

        let result = update_task(
            &pool,
            &bob,
            &created.task.id,
            UpdateTaskRequest {
                title: Some("Hijacked".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_task_cascades() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store7@example.com").await;

        let tag = crate::db::tags::insert_tag(
            &pool,
            &user,
            NewTagRequest {
                name: "t".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();
        let mut req = new_task("Doomed");
        req.tag_ids = Some(vec![tag.id.clone()]);
        let created = insert_task(&pool, &user, req).await.unwrap();

        crate::services::pomodoro::start(
            &pool,
            &user,
            crate::models::StartSessionRequest {
                task_id: created.task.id.clone(),
                duration: 25,
            },
        )
        .await
        .unwrap();

        assert!(delete_task(&pool, &user, &created.task.id).await.unwrap());
        assert!(fetch_task(&pool, &user, &created.task.id).await.unwrap().is_none());

        let orphan_links: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM task_tags WHERE task_id = ?")
                .bind(&created.task.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(orphan_links, 0);
        let orphan_sessions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pomodoro_sessions WHERE task_id = ?")
                .bind(&created.task.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(orphan_sessions, 0);
    }

    #[tokio::test]
    async fn test_reorder_applies_set_and_skips_foreign_ids() {
        let pool = setup_pool().await;
        let alice = seed_user(&pool, "alice3@example.com").await;
        let bob = seed_user(&pool, "bob3@example.com").await;

        let a = insert_task(&pool, &alice, new_task("A")).await.unwrap();
        let b = insert_task(&pool, &alice, new_task("B")).await.unwrap();
        let foreign = insert_task(&pool, &bob, new_task("Foreign")).await.unwrap();

        reorder_tasks(
            &pool,
            &alice,
            &[
                ReorderEntry {
                    id: a.task.id.clone(),
                    display_order: 5,
                },
                ReorderEntry {
                    id: b.task.id.clone(),
                    display_order: 2,
                },
                ReorderEntry {
                    id: foreign.task.id.clone(),
                    display_order: 99,
                },
            ],
        )
        .await
        .unwrap();

        let a = fetch_task(&pool, &alice, &a.task.id).await.unwrap().unwrap();
        let b = fetch_task(&pool, &alice, &b.task.id).await.unwrap().unwrap();
        let foreign = fetch_task(&pool, &bob, &foreign.task.id).await.unwrap().unwrap();
        assert_eq!(a.task.display_order, 5);
        assert_eq!(b.task.display_order, 2);
        assert_eq!(foreign.task.display_order, 0);
    }

    #[tokio::test]
    async fn test_fetch_tasks_ordering() {
        let pool = setup_pool().await;
        let user = seed_user(&pool, "store8@example.com").await;

        let first = insert_task(&pool, &user, new_task("first")).await.unwrap();
        let second = insert_task(&pool, &user, new_task("second")).await.unwrap();

        reorder_tasks(
            &pool,
            &user,
            &[ReorderEntry {
                id: first.task.id.clone(),
                display_order: 10,
            }],
        )
        .await
        .unwrap();

        let tasks = fetch_tasks(&pool, &user).await.unwrap();
        assert_eq!(tasks[0].task.id, second.task.id);
        assert_eq!(tasks[1].task.id, first.task.id);
    }
}
