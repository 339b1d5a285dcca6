//! User database operations

use super::map_write_error;
use kvt_common::models::{User, UserId};
use kvt_common::{time, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
    }
}

/// Insert a user; names are unique
pub async fn insert_user(pool: &SqlitePool, name: &str, password_hash: &str) -> Result<User> {
    if name.trim().is_empty() {
        return Err(Error::Validation("user name must not be blank".to_string()));
    }

    let id = sqlx::query("INSERT INTO users (name, password_hash, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(password_hash)
        .bind(time::now_millis())
        .execute(pool)
        .await
        .map_err(|e| map_write_error(e, &format!("user '{}'", name)))?
        .last_insert_rowid();

    Ok(User {
        id,
        name: name.to_string(),
        password_hash: password_hash.to_string(),
    })
}

pub async fn load_user(pool: &SqlitePool, id: UserId) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, name, password_hash FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(user_from_row))
}

/// Exact (case-sensitive) name lookup
pub async fn load_user_by_name(pool: &SqlitePool, name: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, name, password_hash FROM users WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(user_from_row))
}
