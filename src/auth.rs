//! Authentication blueprint: user registration and login.
//!
//! Passwords are stored as SHA-256 of `secret_key \0 username \0
//! password`; the configured secret key acts as the pepper and the
//! username as the salt.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::app_state::AppState;
use crate::error::ServerError;
use crate::routes::Blueprint;

/// Username/password pair accepted by both auth endpoints.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Unique username.
    pub username: String,
    /// Plaintext password; only its hash is stored.
    pub password: String,
}

/// Public view of a stored user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Row id.
    pub id: i64,
    /// Username.
    pub username: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// A stored user row, as returned by the query layer.
#[derive(Debug, Clone, Copy)]
pub struct UserRecord {
    /// Row id.
    pub id: i64,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Builds the auth blueprint: `POST /auth/register`, `POST /auth/login`.
#[must_use]
pub fn blueprint() -> Blueprint {
    Blueprint::new("auth", "/auth")
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
}

/// `POST /auth/register` — Create a new user.
async fn register_handler(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
    if creds.username.is_empty() || creds.password.is_empty() {
        return Err(ServerError::InvalidCredentials);
    }
    let user =
        register_user(&state.db, &state.secret_key, &creds.username, &creds.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            username: creds.username,
            created_at: user.created_at,
        }),
    ))
}

/// `POST /auth/login` — Verify a username/password pair.
async fn login_handler(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Json<UserResponse>, ServerError> {
    let user = verify_user(&state.db, &state.secret_key, &creds.username, &creds.password).await?;
    Ok(Json(UserResponse {
        id: user.id,
        username: creds.username,
        created_at: user.created_at,
    }))
}

/// Inserts a new user, returning the stored row.
///
/// # Errors
///
/// [`ServerError::UserExists`] when the username is taken,
/// [`ServerError::Database`] on other query failures.
pub async fn register_user(
    pool: &SqlitePool,
    secret_key: &str,
    username: &str,
    password: &str,
) -> Result<UserRecord, ServerError> {
    let hash = hash_password(secret_key, username, password);
    let result = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
        "INSERT INTO users (username, password_hash) VALUES (?1, ?2) RETURNING id, created_at",
    )
    .bind(username)
    .bind(&hash)
    .fetch_one(pool)
    .await;

    match result {
        Ok((id, created_at)) => {
            tracing::info!(username, "user registered");
            Ok(UserRecord { id, created_at })
        }
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            Err(ServerError::UserExists(username.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Checks a username/password pair, returning the stored row.
///
/// # Errors
///
/// [`ServerError::InvalidCredentials`] on unknown user or wrong password,
/// [`ServerError::Database`] on query failure.
pub async fn verify_user(
    pool: &SqlitePool,
    secret_key: &str,
    username: &str,
    password: &str,
) -> Result<UserRecord, ServerError> {
    let row: Option<(i64, String, DateTime<Utc>)> =
        sqlx::query_as("SELECT id, password_hash, created_at FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    let Some((id, stored_hash, created_at)) = row else {
        return Err(ServerError::InvalidCredentials);
    };
    if stored_hash != hash_password(secret_key, username, password) {
        return Err(ServerError::InvalidCredentials);
    }
    Ok(UserRecord { id, created_at })
}

/// Salted, peppered SHA-256 hash, hex encoded.
fn hash_password(secret_key: &str, username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hasher.update(b"\x00");
    hasher.update(username.as_bytes());
    hasher.update(b"\x00");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_pool() -> SqlitePool {
        let Ok(pool) = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
        else {
            panic!("in-memory sqlite failed");
        };
        let Ok(()) = db::init_schema(&pool).await else {
            panic!("schema init failed");
        };
        pool
    }

    #[tokio::test]
    async fn register_and_verify_round_trip() {
        let pool = test_pool().await;
        let Ok(user) = register_user(&pool, "dev", "alice", "s3cret").await else {
            panic!("registration failed");
        };
        let Ok(verified) = verify_user(&pool, "dev", "alice", "s3cret").await else {
            panic!("verification failed");
        };
        assert_eq!(user.id, verified.id);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let pool = test_pool().await;
        let Ok(_) = register_user(&pool, "dev", "alice", "s3cret").await else {
            panic!("registration failed");
        };
        let result = verify_user(&pool, "dev", "alice", "wrong").await;
        assert!(matches!(result, Err(ServerError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let pool = test_pool().await;
        let result = verify_user(&pool, "dev", "nobody", "pw").await;
        assert!(matches!(result, Err(ServerError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_username_is_conflict() {
        let pool = test_pool().await;
        let Ok(_) = register_user(&pool, "dev", "alice", "one").await else {
            panic!("registration failed");
        };
        let result = register_user(&pool, "dev", "alice", "two").await;
        assert!(matches!(result, Err(ServerError::UserExists(_))));
    }

    #[tokio::test]
    async fn pepper_changes_the_hash() {
        let pool = test_pool().await;
        let Ok(_) = register_user(&pool, "pepper-a", "alice", "pw").await else {
            panic!("registration failed");
        };
        let result = verify_user(&pool, "pepper-b", "alice", "pw").await;
        assert!(matches!(result, Err(ServerError::InvalidCredentials)));
    }

    #[test]
    fn hash_is_hex_and_deterministic() {
        let a = hash_password("dev", "alice", "pw");
        let b = hash_password("dev", "alice", "pw");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
