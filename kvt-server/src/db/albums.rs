//! Album database operations

use super::{insert_positions, load_positions, map_write_error};
use kvt_common::models::{Album, AlbumId, ArtistId, SongId};
use kvt_common::{sanitize, time, Result};
use sqlx::{Row, SqlitePool};

const INSERT_ALBUM_ARTIST: &str =
    "INSERT INTO album_artists (album_id, position, artist_id) VALUES (?, ?, ?)";
const INSERT_ALBUM_SONG: &str =
    "INSERT INTO album_songs (album_id, position, song_id) VALUES (?, ?, ?)";
const SELECT_ALBUM_ARTISTS: &str =
    "SELECT artist_id FROM album_artists WHERE album_id = ? ORDER BY position";
const SELECT_ALBUM_SONGS: &str =
    "SELECT song_id FROM album_songs WHERE album_id = ? ORDER BY position";

/// Insert an album unconditionally
pub async fn insert_album(
    pool: &SqlitePool,
    name: &str,
    artist_ids: &[ArtistId],
    song_ids: &[SongId],
) -> Result<Album> {
    let what = format!("album '{}'", name);
    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        r#"
        INSERT INTO albums (name, sanitized_name, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(sanitize(name))
    .bind(time::now_millis())
    .execute(&mut *tx)
    .await
    .map_err(|e| map_write_error(e, &what))?
    .last_insert_rowid();

    insert_positions(&mut tx, INSERT_ALBUM_ARTIST, id, artist_ids)
        .await
        .map_err(|e| map_write_error(e, &what))?;
    insert_positions(&mut tx, INSERT_ALBUM_SONG, id, song_ids)
        .await
        .map_err(|e| map_write_error(e, &what))?;

    tx.commit().await?;

    Ok(Album {
        id,
        name: name.to_string(),
        artist_ids: artist_ids.to_vec(),
        song_ids: song_ids.to_vec(),
    })
}

pub async fn load_album(pool: &SqlitePool, id: AlbumId) -> Result<Option<Album>> {
    let row = sqlx::query("SELECT id, name FROM albums WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Album {
            id: row.get("id"),
            name: row.get("name"),
            artist_ids: load_positions(pool, SELECT_ALBUM_ARTISTS, id).await?,
            song_ids: load_positions(pool, SELECT_ALBUM_SONGS, id).await?,
        })),
        None => Ok(None),
    }
}

/// Albums whose sanitized name contains the sanitized query, by id
pub async fn search_albums(pool: &SqlitePool, query: &str) -> Result<Vec<Album>> {
    let ids = sqlx::query_scalar::<_, AlbumId>(
        r#"
        SELECT id FROM albums
        WHERE instr(sanitized_name, ?) > 0
        ORDER BY id
        "#,
    )
    .bind(sanitize(query))
    .fetch_all(pool)
    .await?;

    let mut albums = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(album) = load_album(pool, id).await? {
            albums.push(album);
        }
    }
    Ok(albums)
}
