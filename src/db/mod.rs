pub mod tags;
pub mod tasks;
pub mod users;

use chrono::Utc;

/// Current UTC timestamp, RFC 3339. Every mutation stamps `updated_at`
/// with this.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
pub(crate) mod testutil {
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::MIGRATOR;
    use crate::models::RegisterRequest;

    /// In-memory pool pinned to a single connection so every query sees
    /// the same database.
    pub async fn setup_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        MIGRATOR.run(&pool).await.expect("Failed to run migrations");

        pool
    }

    pub async fn seed_user(pool: &SqlitePool, email: &str) -> String {
        let (user, _token) = crate::auth::register(
            pool,
            RegisterRequest {
                name: "Test User".to_string(),
                email: email.to_string(),
                password: "password123".to_string(),
            },
        )
        .await
        .expect("Failed to seed user");
        user.id
    }
}
