pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

/// Embedded migrations, applied at startup and by the test helpers.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
