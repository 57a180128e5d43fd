//! Focus-session tracking. A session starts against an owned task and
//! either completes (counts as a pomodoro, credits elapsed time) or is
//! cancelled (row removed, elapsed time still credited). Session
//! finalization and task counters always move in the same transaction.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{now_iso, tasks};
use crate::error::AppError;
use crate::models::{
    CancelSessionRequest, CompleteSessionRequest, PomodoroSession, StartSessionRequest,
    TaskWithTags,
};

pub async fn start(
    db: &SqlitePool,
    user_id: &str,
    req: StartSessionRequest,
) -> Result<PomodoroSession, AppError> {
    let owned =
        sqlx::query_scalar::<_, String>("SELECT id FROM tasks WHERE id = ? AND user_id = ?")
            .bind(&req.task_id)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    let id = Uuid::new_v4().to_string();
    let now = now_iso();

    sqlx::query(
        "INSERT INTO pomodoro_sessions (id, task_id, user_id, duration, completed, started_at)
         VALUES (?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(&req.task_id)
    .bind(user_id)
    .bind(req.duration)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(PomodoroSession {
        id,
        task_id: req.task_id,
        user_id: user_id.to_string(),
        duration: req.duration,
        completed: false,
        started_at: now,
        completed_at: None,
    })
}

/// Finalizes a full session: marks it completed and credits the task
/// with the elapsed seconds plus one pomodoro, atomically.
pub async fn complete(
    db: &SqlitePool,
    user_id: &str,
    req: CompleteSessionRequest,
) -> Result<TaskWithTags, AppError> {
    let mut tx = db.begin().await?;
    let now = now_iso();

    let finalized = sqlx::query(
        "UPDATE pomodoro_sessions SET completed = 1, completed_at = ?
         WHERE id = ? AND task_id = ? AND user_id = ? AND completed = 0",
    )
    .bind(&now)
    .bind(&req.session_id)
    .bind(&req.task_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if finalized == 0 {
        return Err(AppError::NotFound);
    }

    let credited = sqlx::query(
        "UPDATE tasks
         SET time_spent = time_spent + ?, pomodoro_count = pomodoro_count + 1, updated_at = ?
         WHERE id = ? AND user_id = ?",
    )
    .bind(req.actual_duration)
    .bind(&now)
    .bind(&req.task_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if credited == 0 {
        return Err(AppError::NotFound);
    }

    tx.commit().await?;

    require_task(db, user_id, &req.task_id).await
}

/// Abandons a running session. The row is removed (it never counts as a
/// pomodoro) but any elapsed seconds still accrue to the task.
pub async fn cancel(
    db: &SqlitePool,
    user_id: &str,
    req: CancelSessionRequest,
) -> Result<TaskWithTags, AppError> {
    let mut tx = db.begin().await?;

    let removed = sqlx::query(
        "DELETE FROM pomodoro_sessions WHERE id = ? AND task_id = ? AND user_id = ?",
    )
    .bind(&req.session_id)
    .bind(&req.task_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if removed == 0 {
        return Err(AppError::NotFound);
    }

    if req.actual_duration > 0 {
        let credited = sqlx::query(
            "UPDATE tasks SET time_spent = time_spent + ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(req.actual_duration)
        .bind(now_iso())
        .bind(&req.task_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if credited == 0 {
            return Err(AppError::NotFound);
        }
    }

    tx.commit().await?;

    require_task(db, user_id, &req.task_id).await
}

/// Zeroes the task's accumulated counters. Completed-session history
/// rows are left in place.
pub async fn reset(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
) -> Result<TaskWithTags, AppError> {
    let updated = sqlx::query(
        "UPDATE tasks SET time_spent = 0, pomodoro_count = 0, updated_at = ?
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

/// Last 10 completed sessions for the task, most recent first.
pub async fn history(
    db: &SqlitePool,
    user_id: &str,
    task_id: &str,
) -> Result<Vec<PomodoroSession>, AppError> {
    let owned =
        sqlx::query_scalar::<_, String>("SELECT id FROM tasks WHERE id = ? AND user_id = ?")
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    let sessions = sqlx::query_as::<_, PomodoroSession>(
        "SELECT * FROM pomodoro_sessions
         WHERE task_id = ? AND user_id = ? AND completed = 1
         ORDER BY completed_at DESC
         LIMIT 10",
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(sessions)
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
