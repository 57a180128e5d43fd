//! Credential handling and request authentication.
//!
//! Passwords are stored as `salt$digest` where the digest is a salted
//! SHA-256, base64-encoded. Bearer tokens are opaque UUIDs held in the
//! auth_sessions table; presenting one resolves to the owning user id.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::db::users;
use crate::error::AppError;
use crate::models::{LoginRequest, RegisterRequest, User};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = BASE64.encode(salt);
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    BASE64.encode(hasher.finalize())
}

pub async fn register(
    db: &SqlitePool,
    req: RegisterRequest,
) -> Result<(User, String), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if !req.email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if users::find_by_email(db, &req.email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let user = users::insert_user(db, &req.name, &req.email, &hash_password(&req.password)).await?;
    let token = users::create_session(db, &user.id).await?;

    Ok((user, token))
}

pub async fn login(db: &SqlitePool, req: LoginRequest) -> Result<(User, String), AppError> {
    // One generic message for both unknown email and bad password.
    let invalid = || AppError::Auth("Invalid email or password".to_string());

    let user = users::find_by_email(db, &req.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = users::create_session(db, &user.id).await?;

    Ok((user, token))
}

/// Invalidates the presented token. Deleting an already-deleted token is
/// a quiet success.
pub async fn logout(db: &SqlitePool, token: &str) -> Result<(), AppError> {
    users::delete_session(db, token).await?;
    Ok(())
}

pub fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .ok_or_else(|| AppError::Auth("Authentication required".to_string()))
}

/// The authenticated owner, resolved from the bearer token. Every
/// task/tag/pomodoro route takes this extractor.
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user_id = users::session_user(&state.db, &token)
            .await?
            .ok_or_else(|| AppError::Auth("Invalid or expired token".to_string()))?;
        Ok(AuthUser(user_id))
    }
}
