//! Song database operations
//!
//! Song rows are unique on their sanitized name. Credited artists live in
//! `song_artists` keyed by `(song_id, position)`.

use super::{insert_positions, load_positions, map_write_error};
use kvt_common::models::{ArtistId, Song, SongId};
use kvt_common::{sanitize, time, Error, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

const INSERT_SONG_ARTIST: &str =
    "INSERT INTO song_artists (song_id, position, artist_id) VALUES (?, ?, ?)";
const SELECT_SONG_ARTISTS: &str =
    "SELECT artist_id FROM song_artists WHERE song_id = ? ORDER BY position";

/// Insert a song and its ordered artist credits
///
/// Fails with [`Error::Conflict`] when a song with the same sanitized name
/// exists and with [`Error::Validation`] when an artist id is unknown.
pub async fn insert_song(
    pool: &SqlitePool,
    name: &str,
    artist_ids: &[ArtistId],
    is_single: bool,
) -> Result<Song> {
    let sanitized = sanitize(name);
    if sanitized.is_empty() {
        return Err(Error::Validation(format!(
            "song name '{}' is blank after sanitizing",
            name
        )));
    }

    let what = format!("song '{}'", name);
    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        r#"
        INSERT INTO songs (name, sanitized_name, is_single, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&sanitized)
    .bind(is_single)
    .bind(time::now_millis())
    .execute(&mut *tx)
    .await
    .map_err(|e| map_write_error(e, &what))?
    .last_insert_rowid();

    insert_positions(&mut tx, INSERT_SONG_ARTIST, id, artist_ids)
        .await
        .map_err(|e| map_write_error(e, &what))?;

    tx.commit().await?;

    Ok(Song {
        id,
        name: name.to_string(),
        artist_ids: artist_ids.to_vec(),
        is_single,
    })
}

pub async fn load_song(pool: &SqlitePool, id: SongId) -> Result<Option<Song>> {
    let row = sqlx::query("SELECT id, name, is_single FROM songs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(Song {
        id: row.get("id"),
        name: row.get("name"),
        artist_ids: load_positions(pool, SELECT_SONG_ARTISTS, id).await?,
        is_single: row.get("is_single"),
    }))
}

/// Songs whose sanitized name contains the sanitized query, by id
pub async fn search_songs(pool: &SqlitePool, query: &str) -> Result<Vec<Song>> {
    let needle = sanitize(query);

    let rows = sqlx::query(
        r#"
        SELECT id, name, is_single FROM songs
        WHERE instr(sanitized_name, ?) > 0
        ORDER BY id
        "#,
    )
    .bind(&needle)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    // Credits for every matching song in one pass
    let credit_rows = sqlx::query(
        r#"
        SELECT sa.song_id, sa.artist_id FROM song_artists sa
        JOIN songs s ON s.id = sa.song_id
        WHERE instr(s.sanitized_name, ?) > 0
        ORDER BY sa.song_id, sa.position
        "#,
    )
    .bind(&needle)
    .fetch_all(pool)
    .await?;

    let mut credits: HashMap<SongId, Vec<ArtistId>> = HashMap::new();
    for row in &credit_rows {
        credits
            .entry(row.get("song_id"))
            .or_default()
            .push(row.get("artist_id"));
    }

    Ok(rows
        .iter()
        .map(|row| {
            let id: SongId = row.get("id");
            Song {
                id,
                name: row.get("name"),
                artist_ids: credits.remove(&id).unwrap_or_default(),
                is_single: row.get("is_single"),
            }
        })
        .collect())
}
