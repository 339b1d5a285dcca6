//! SQLite persistence for the library
//!
//! Each submodule holds the free async functions for one table family. They
//! take a `&SqlitePool`, run plain `sqlx::query` statements and return
//! `kvt_common::Result`. Id lists live in `(owner, position)` association
//! tables and are read back in position order.

pub mod activity;
pub mod albums;
pub mod artists;
pub mod playlists;
pub mod schema;
pub mod sessions;
pub mod songs;
pub mod users;

use kvt_common::config::DatabaseConfig;
use kvt_common::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use std::time::Duration;

/// Initialize database connection pool
///
/// Creates the file (and its parent directory) when missing, enables WAL
/// and creates the schema.
pub async fn init_database_pool(db_path: &Path, config: &DatabaseConfig) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    tracing::debug!(
        path = %db_path.display(),
        max_connections = config.max_connections,
        "Connecting to database"
    );

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(config.max_lock_wait_ms))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_millis(config.max_lock_wait_ms.max(1000)))
        .connect_with(options)
        .await?;

    schema::init_tables(&pool).await?;

    tracing::info!(path = %db_path.display(), "Database ready");

    Ok(pool)
}

/// Classify a failed insert
///
/// Unique violations become [`Error::Conflict`], foreign key violations
/// [`Error::Validation`]; anything else stays a database error.
pub(crate) fn map_write_error(err: sqlx::Error, what: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::Conflict(format!("{} already exists", what));
        }
        if db_err.is_foreign_key_violation() {
            return Error::Validation(format!("{} references an unknown id", what));
        }
    }
    Error::Database(err)
}

/// Write an ordered id list into an `(owner, position, value)` table
///
/// `sql` is an insert with three placeholders in that order.
pub(crate) async fn insert_positions(
    conn: &mut SqliteConnection,
    sql: &str,
    owner_id: i64,
    ids: &[i64],
) -> std::result::Result<(), sqlx::Error> {
    for (position, id) in ids.iter().enumerate() {
        sqlx::query(sql)
            .bind(owner_id)
            .bind(position as i64)
            .bind(*id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Read an ordered id list back
///
/// `sql` selects the value column for one owner, ordered by position.
pub(crate) async fn load_positions(pool: &SqlitePool, sql: &str, owner_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
    Ok(ids)
}
