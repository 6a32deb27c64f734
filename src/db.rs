//! SQLite initialization and bootstrap.
//!
//! The database lives in a local file (created on first start, WAL
//! journal mode). Setup creates the schema and a bootstrap `root`/`root`
//! account; the fixed credentials are preserved deliberately from the
//! system this replaces and logged at WARN so the default cannot pass
//! silently.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::auth;
use crate::error::ServerError;

/// Username of the bootstrap account.
pub const BOOTSTRAP_USER: &str = "root";

/// Password of the bootstrap account. Fixed, not configurable.
const BOOTSTRAP_PASSWORD: &str = "root";

/// Opens (creating if missing) the SQLite database at `db_path`.
///
/// # Errors
///
/// Returns [`ServerError::Io`] if the parent directory cannot be created
/// and [`ServerError::Database`] on connection failure.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool, ServerError> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Creates the schema if it does not exist.
///
/// # Errors
///
/// Returns [`ServerError::Database`] on query failure.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), ServerError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Creates the bootstrap `root` account when absent.
///
/// # Errors
///
/// Returns [`ServerError::Database`] on query failure.
pub async fn bootstrap_root(pool: &SqlitePool, secret_key: &str) -> Result<(), ServerError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?1")
        .bind(BOOTSTRAP_USER)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    auth::register_user(pool, secret_key, BOOTSTRAP_USER, BOOTSTRAP_PASSWORD).await?;
    tracing::warn!(
        username = BOOTSTRAP_USER,
        "bootstrap account created with fixed default credentials; change them"
    );
    Ok(())
}
