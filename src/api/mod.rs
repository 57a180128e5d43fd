use axum::Json;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::routing::{delete, post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthUser, bearer_token};
use crate::db::{tags, tasks};
use crate::error::AppError;
use crate::models::*;
use crate::services::{pomodoro, rules};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/tasks/{id}/eisenhower", put(set_eisenhower))
        .route("/tasks/{id}/unprioritize", put(unprioritize))
        .route("/tasks/schedule-all-today", post(schedule_all_today))
        .route("/tasks/{id}/highlight", put(set_highlight).delete(remove_highlight))
        .route("/tasks/{id}/frog", put(set_frog).delete(remove_frog))
        .route("/tasks/reorder", post(reorder))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", delete(delete_tag))
        .route("/pomodoro/start", post(pomodoro_start))
        .route("/pomodoro/complete", post(pomodoro_complete))
        .route("/pomodoro/cancel", post(pomodoro_cancel))
        .route("/pomodoro/history/{task_id}", get(pomodoro_history))
        .route("/pomodoro/reset/{task_id}", delete(pomodoro_reset))
        .with_state(state)
}

// ---- response envelopes ----

#[derive(Serialize)]
struct Ack {
    success: bool,
    message: String,
}

impl Ack {
    fn ok(message: &str) -> Json<Ack> {
        Json(Ack {
            success: true,
            message: message.to_string(),
        })
    }
}

#[derive(Serialize)]
struct AuthBody {
    success: bool,
    user: User,
    token: String,
}

#[derive(Serialize)]
struct TaskBody {
    success: bool,
    task: TaskWithTags,
}

impl TaskBody {
    fn ok(task: TaskWithTags) -> Json<TaskBody> {
        Json(TaskBody {
            success: true,
            task,
        })
    }
}

#[derive(Serialize)]
struct TasksBody {
    success: bool,
    tasks: Vec<TaskWithTags>,
}

#[derive(Serialize)]
struct CountBody {
    success: bool,
    count: u64,
}

#[derive(Serialize)]
struct TagBody {
    success: bool,
    tag: Tag,
}

#[derive(Serialize)]
struct TagsBody {
    success: bool,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagDeleteBody {
    success: bool,
    message: String,
    affected_tasks: u64,
}

#[derive(Serialize)]
struct SessionBody {
    success: bool,
    session: PomodoroSession,
}

#[derive(Serialize)]
struct SessionsBody {
    success: bool,
    sessions: Vec<PomodoroSession>,
}

// ---- request bodies owned by the routing layer ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EisenhowerRequest {
    is_urgent: bool,
    is_important: bool,
}

#[derive(Deserialize)]
struct HighlightRequest {
    date: String,
}

#[derive(Deserialize)]
struct ScheduleAllRequest {
    date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderRequest {
    task_orders: Vec<ReorderEntry>,
}

// ---- handlers ----

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthBody>, AppError> {
    let (user, token) = auth::register(&state.db, req).await?;
    Ok(Json(AuthBody {
        success: true,
        user,
        token,
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthBody>, AppError> {
    let (user, token) = auth::login(&state.db, req).await?;
    Ok(Json(AuthBody {
        success: true,
        user,
        token,
    }))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Ack>, AppError> {
    let token = bearer_token(&headers)?;
    auth::logout(&state.db, &token).await?;
    Ok(Ack::ok("Logged out"))
}

async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TasksBody>, AppError> {
    let tasks = tasks::fetch_tasks(&state.db, &user_id).await?;
    Ok(Json(TasksBody {
        success: true,
        tasks,
    }))
}

async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<NewTaskRequest>,
) -> Result<Json<TaskBody>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    let task = tasks::insert_task(&state.db, &user_id, req).await?;
    Ok(TaskBody::ok(task))
}

async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskBody>, AppError> {
    let task = tasks::update_task(&state.db, &user_id, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(TaskBody::ok(task))
}

async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Ack>, AppError> {
    if !tasks::delete_task(&state.db, &user_id, &id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Ack::ok("Task deleted"))
}

async fn set_eisenhower(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<EisenhowerRequest>,
) -> Result<Json<TaskBody>, AppError> {
    let task =
        rules::set_eisenhower(&state.db, &user_id, &id, req.is_urgent, req.is_important).await?;
    Ok(TaskBody::ok(task))
}

async fn unprioritize(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskBody>, AppError> {
    let task = rules::unprioritize(&state.db, &user_id, &id).await?;
    Ok(TaskBody::ok(task))
}

async fn schedule_all_today(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    req: Option<Json<ScheduleAllRequest>>,
) -> Result<Json<CountBody>, AppError> {
    let date = req
        .and_then(|Json(r)| r.date)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let count = rules::schedule_all_prioritized(&state.db, &user_id, &date).await?;
    Ok(Json(CountBody {
        success: true,
        count,
    }))
}

async fn set_highlight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<HighlightRequest>,
) -> Result<Json<TaskBody>, AppError> {
    let task = rules::set_highlight(&state.db, &user_id, &id, &req.date).await?;
    Ok(TaskBody::ok(task))
}

async fn remove_highlight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskBody>, AppError> {
    let task = rules::remove_highlight(&state.db, &user_id, &id).await?;
    Ok(TaskBody::ok(task))
}

async fn set_frog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskBody>, AppError> {
    let task = rules::set_frog(&state.db, &user_id, &id).await?;
    Ok(TaskBody::ok(task))
}

async fn remove_frog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskBody>, AppError> {
    let task = rules::remove_frog(&state.db, &user_id, &id).await?;
    Ok(TaskBody::ok(task))
}

async fn reorder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Ack>, AppError> {
    tasks::reorder_tasks(&state.db, &user_id, &req.task_orders).await?;
    Ok(Ack::ok("Order updated"))
}

async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TagsBody>, AppError> {
    let tags = tags::fetch_tags(&state.db, &user_id).await?;
    Ok(Json(TagsBody {
        success: true,
        tags,
    }))
}

async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<NewTagRequest>,
) -> Result<Json<TagBody>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Tag name is required".to_string()));
    }
    let tag = tags::insert_tag(&state.db, &user_id, req).await?;
    Ok(Json(TagBody {
        success: true,
        tag,
    }))
}

async fn delete_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TagDeleteBody>, AppError> {
    let affected = tags::delete_tag(&state.db, &user_id, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(TagDeleteBody {
        success: true,
        message: format!("Tag deleted, removed from {} task(s)", affected),
        affected_tasks: affected,
    }))
}

async fn pomodoro_start(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<SessionBody>, AppError> {
    let session = pomodoro::start(&state.db, &user_id, req).await?;
    Ok(Json(SessionBody {
        success: true,
        session,
    }))
}

async fn pomodoro_complete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CompleteSessionRequest>,
) -> Result<Json<TaskBody>, AppError> {
    let task = pomodoro::complete(&state.db, &user_id, req).await?;
    Ok(TaskBody::ok(task))
}

async fn pomodoro_cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CancelSessionRequest>,
) -> Result<Json<TaskBody>, AppError> {
    let task = pomodoro::cancel(&state.db, &user_id, req).await?;
    Ok(TaskBody::ok(task))
}

async fn pomodoro_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<SessionsBody>, AppError> {
    let sessions = pomodoro::history(&state.db, &user_id, &task_id).await?;
    Ok(Json(SessionsBody {
        success: true,
        sessions,
    }))
}

async fn pomodoro_reset(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<TaskBody>, AppError> {
    let task = pomodoro::reset(&state.db, &user_id, &task_id).await?;
    Ok(TaskBody::ok(task))
}
