//! Artist database operations

use super::map_write_error;
use kvt_common::models::{Artist, ArtistId};
use kvt_common::{sanitize, time, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

fn artist_from_row(row: &SqliteRow) -> Artist {
    Artist {
        id: row.get("id"),
        name: row.get("name"),
    }
}

/// Insert a new artist
///
/// Fails with [`Error::Conflict`] when an artist with the same sanitized
/// name already exists.
pub async fn insert_artist(pool: &SqlitePool, name: &str) -> Result<Artist> {
    let sanitized = sanitize(name);
    if sanitized.is_empty() {
        return Err(Error::Validation(format!(
            "artist name '{}' is blank after sanitizing",
            name
        )));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO artists (name, sanitized_name, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&sanitized)
    .bind(time::now_millis())
    .execute(pool)
    .await
    .map_err(|e| map_write_error(e, &format!("artist '{}'", name)))?
    .last_insert_rowid();

    Ok(Artist {
        id,
        name: name.to_string(),
    })
}

pub async fn load_artist(pool: &SqlitePool, id: ArtistId) -> Result<Option<Artist>> {
    let row = sqlx::query("SELECT id, name FROM artists WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(artist_from_row))
}

/// Artists whose sanitized name contains the sanitized query, by id
pub async fn search_artists(pool: &SqlitePool, query: &str) -> Result<Vec<Artist>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name FROM artists
        WHERE instr(sanitized_name, ?) > 0
        ORDER BY id
        "#,
    )
    .bind(sanitize(query))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(artist_from_row).collect())
}
