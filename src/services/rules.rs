//! Cross-field state transitions for task classification.
//!
//! Two per-owner exclusivity groups exist: the daily highlight and the
//! frog. Each holds at most one task at a time, and a single task can
//! never sit in both. Swaps run as clear-then-set inside one database
//! transaction so a concurrent reader never observes two members of a
//! group, and a missing or foreign target aborts with no side effects.

use sqlx::SqlitePool;

use crate::db::{now_iso, tasks};
use crate::error::AppError;
use crate::models::TaskWithTags;

/// Places the task in the Eisenhower matrix. Matrix placement always
/// implies prioritization; highlight, frog, and schedule are untouched.
pub async fn set_eisenhower(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
    is_urgent: bool,
    is_important: bool,
) -> Result<TaskWithTags, AppError> {
    let updated = sqlx::query(
        "UPDATE tasks
         SET is_urgent = ?, is_important = ?, is_prioritized = 1, updated_at = ?
         WHERE id = ? AND user_id = ?",
    )
    .bind(is_urgent)
    .bind(is_important)
    .bind(now_iso())
    .bind(task_id)
    .bind(user_id)
    .execute(db)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound);
    }

    require_task(db, user_id, task_id).await
}

/// Returns the task to the backlog: both matrix flags and the
/// prioritized bit drop. Any scheduled date stays as-is.
pub async fn unprioritize(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
) -> Result<TaskWithTags, AppError> {
    let updated = sqlx::query(
        "UPDATE tasks
         SET is_prioritized = 0, is_urgent = 0, is_important = 0, updated_at = ?
         WHERE id = ? AND user_id = ?",
    )
    .bind(now_iso())
    .bind(task_id)
    .bind(user_id)
    .execute(db)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound);
    }

    require_task(db, user_id, task_id).await
}

/// Makes the task the owner's daily highlight for `date`, displacing any
/// previous highlight and clearing frog status on the target.
pub async fn set_highlight(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
    date: &str,
) -> Result<TaskWithTags, AppError> {
    let mut tx = db.begin().await?;
    let now = now_iso();

    probe_owned(&mut tx, user_id, task_id).await?;

    sqlx::query(
        "UPDATE tasks
         SET is_daily_highlight = 0, highlight_date = NULL, updated_at = ?
         WHERE user_id = ? AND is_daily_highlight = 1 AND id <> ?",
    )
    .bind(&now)
    .bind(user_id)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE tasks
         SET is_daily_highlight = 1, highlight_date = ?, is_frog = 0, updated_at = ?
         WHERE id = ?",
    )
    .bind(date)
    .bind(&now)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    require_task(db, user_id, task_id).await
}

pub async fn remove_highlight(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
) -> Result<TaskWithTags, AppError> {
    let updated = sqlx::query(
        "UPDATE tasks
         SET is_daily_highlight = 0, highlight_date = NULL, updated_at = ?
         WHERE id = ? AND user_id = ?",
    )
    .bind(now_iso())
    .bind(task_id)
    .bind(user_id)
    .execute(db)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound);
    }

    require_task(db, user_id, task_id).await
}

/// Makes the task the owner's frog, displacing any previous frog and
/// clearing highlight status on the target.
pub async fn set_frog(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
) -> Result<TaskWithTags, AppError> {
    let mut tx = db.begin().await?;
    let now = now_iso();

    probe_owned(&mut tx, user_id, task_id).await?;

    sqlx::query(
        "UPDATE tasks SET is_frog = 0, updated_at = ?
         WHERE user_id = ? AND is_frog = 1 AND id <> ?",
    )
    .bind(&now)
    .bind(user_id)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE tasks
         SET is_frog = 1, is_daily_highlight = 0, highlight_date = NULL, updated_at = ?
         WHERE id = ?",
    )
    .bind(&now)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    require_task(db, user_id, task_id).await
}

pub async fn remove_frog(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
) -> Result<TaskWithTags, AppError> {
    let updated = sqlx::query(
        "UPDATE tasks SET is_frog = 0, updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(now_iso())
    .bind(task_id)
    .bind(user_id)
    .execute(db)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound);
    }

    require_task(db, user_id, task_id).await
}

/// Stamps every prioritized-but-unscheduled task with `date`, ordered by
/// quadrant: Do-First 0, Schedule 1, Delegate 2, Eliminate 3. Tasks that
/// already carry a date are untouched. Returns the number scheduled.
pub async fn schedule_all_prioritized(
    db: &SqlitePool,
    user_id: &str,
    date: &str,
) -> Result<u64, AppError> {
    let affected = sqlx::query(
        "UPDATE tasks
         SET scheduled_date = ?,
             display_order = CASE
                 WHEN is_urgent = 1 AND is_important = 1 THEN 0
                 WHEN is_urgent = 0 AND is_important = 1 THEN 1
                 WHEN is_urgent = 1 AND is_important = 0 THEN 2
                 ELSE 3
             END,
             updated_at = ?
         WHERE user_id = ? AND is_prioritized = 1 AND scheduled_date IS NULL",
    )
    .bind(date)
    .bind(now_iso())
    .bind(user_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(affected)
}

/// Ownership probe inside a transaction; a miss aborts the whole
/// operation before any write happens.
async fn probe_owned(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &str,
    task_id: &str,
) -> Result<(), AppError> {
    sqlx::query_scalar::<_, String>("SELECT id FROM tasks WHERE id = ? AND user_id = ?")
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .map(|_| ())
        .ok_or(AppError::NotFound)
}

async fn require_task(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
) -> Result<TaskWithTags, AppError> {
    tasks::fetch_task(db, user_id, task_id)
        .await?
        .ok_or(AppError::NotFound)
}
