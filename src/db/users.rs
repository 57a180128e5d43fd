use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::now_iso;
use crate::models::User;

pub async fn insert_user(
    db: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now_iso();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: now,
    })
}

pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await
}

/// Issues a fresh opaque bearer token for the user.
pub async fn create_session(db: &SqlitePool, user_id: &str) -> Result<String, sqlx::Error> {
    let token = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO auth_sessions (token, user_id, created_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now_iso())
        .execute(db)
        .await?;

    Ok(token)
}

pub async fn delete_session(db: &SqlitePool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
        .bind(token)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Resolves a bearer token to the owning user id.
pub async fn session_user(db: &SqlitePool, token: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT user_id FROM auth_sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(db)
        .await
}
