//! Library schema
//!
//! Every statement is `IF NOT EXISTS`, so initialisation is safe on every
//! start. Timestamps are Unix epoch milliseconds.

use kvt_common::Result;
use sqlx::SqlitePool;

const TABLES: &[(&str, &str)] = &[
    (
        "artists",
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sanitized_name TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "songs",
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sanitized_name TEXT NOT NULL UNIQUE,
            is_single INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "song_artists",
        r#"
        CREATE TABLE IF NOT EXISTS song_artists (
            song_id INTEGER NOT NULL REFERENCES songs(id),
            position INTEGER NOT NULL,
            artist_id INTEGER NOT NULL REFERENCES artists(id),
            PRIMARY KEY (song_id, position)
        )
        "#,
    ),
    (
        "albums",
        r#"
        CREATE TABLE IF NOT EXISTS albums (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sanitized_name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "album_artists",
        r#"
        CREATE TABLE IF NOT EXISTS album_artists (
            album_id INTEGER NOT NULL REFERENCES albums(id),
            position INTEGER NOT NULL,
            artist_id INTEGER NOT NULL REFERENCES artists(id),
            PRIMARY KEY (album_id, position)
        )
        "#,
    ),
    (
        "album_songs",
        r#"
        CREATE TABLE IF NOT EXISTS album_songs (
            album_id INTEGER NOT NULL REFERENCES albums(id),
            position INTEGER NOT NULL,
            song_id INTEGER NOT NULL REFERENCES songs(id),
            PRIMARY KEY (album_id, position)
        )
        "#,
    ),
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "playlists",
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            created_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "playlist_songs",
        r#"
        CREATE TABLE IF NOT EXISTS playlist_songs (
            playlist_id INTEGER NOT NULL REFERENCES playlists(id),
            position INTEGER NOT NULL,
            song_id INTEGER NOT NULL REFERENCES songs(id),
            PRIMARY KEY (playlist_id, position)
        )
        "#,
    ),
    (
        "sessions",
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            user_id INTEGER PRIMARY KEY REFERENCES users(id),
            token TEXT NOT NULL UNIQUE,
            issued_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "new_entities",
        r#"
        CREATE TABLE IF NOT EXISTS new_entities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_kind INTEGER NOT NULL,
            entity_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "recent_entities",
        r#"
        CREATE TABLE IF NOT EXISTS recent_entities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            entity_kind INTEGER NOT NULL,
            entity_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_recent_entities_user ON recent_entities(user_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_albums_sanitized_name ON albums(sanitized_name)",
];

/// Create all library tables and indexes
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    for (name, ddl) in TABLES {
        sqlx::query(ddl).execute(pool).await?;
        tracing::trace!(table = name, "Table ready");
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::debug!(tables = TABLES.len(), "Database tables initialized");
    Ok(())
}
