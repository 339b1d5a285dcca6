//! Playlist database operations

use super::{insert_positions, load_positions, map_write_error};
use kvt_common::models::{Playlist, PlaylistId, SongId, UserId};
use kvt_common::{time, Result};
use sqlx::{Row, SqlitePool};

const INSERT_PLAYLIST_SONG: &str =
    "INSERT INTO playlist_songs (playlist_id, position, song_id) VALUES (?, ?, ?)";
const SELECT_PLAYLIST_SONGS: &str =
    "SELECT song_id FROM playlist_songs WHERE playlist_id = ? ORDER BY position";

/// Insert a playlist owned by `user_id`
pub async fn insert_playlist(
    pool: &SqlitePool,
    name: &str,
    user_id: UserId,
    song_ids: &[SongId],
) -> Result<Playlist> {
    let what = format!("playlist '{}'", name);
    let mut tx = pool.begin().await?;

    let id = sqlx::query("INSERT INTO playlists (name, user_id, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(user_id)
        .bind(time::now_millis())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &what))?
        .last_insert_rowid();

    insert_positions(&mut tx, INSERT_PLAYLIST_SONG, id, song_ids)
        .await
        .map_err(|e| map_write_error(e, &what))?;

    tx.commit().await?;

    Ok(Playlist {
        id,
        name: name.to_string(),
        user_id,
        song_ids: song_ids.to_vec(),
    })
}

pub async fn load_playlist(pool: &SqlitePool, id: PlaylistId) -> Result<Option<Playlist>> {
    let row = sqlx::query("SELECT id, name, user_id FROM playlists WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Playlist {
            id: row.get("id"),
            name: row.get("name"),
            user_id: row.get("user_id"),
            song_ids: load_positions(pool, SELECT_PLAYLIST_SONGS, id).await?,
        })),
        None => Ok(None),
    }
}
