//! Session token persistence
//!
//! One row per user. Logging in again replaces the token in place, so the
//! previous token stops resolving immediately.

use kvt_common::models::{Session, UserId};
use kvt_common::Result;
use sqlx::{Row, SqlitePool};

/// Store `token` as the only live token of `user_id`
pub async fn replace_session(
    pool: &SqlitePool,
    user_id: UserId,
    token: &str,
    issued_at: i64,
) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (user_id, token, issued_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            token = excluded.token,
            issued_at = excluded.issued_at
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(issued_at)
    .execute(pool)
    .await?;

    Ok(Session {
        user_id,
        token: token.to_string(),
        issued_at,
    })
}

pub async fn load_session_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT user_id, token, issued_at FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Session {
        user_id: row.get("user_id"),
        token: row.get("token"),
        issued_at: row.get("issued_at"),
    }))
}
