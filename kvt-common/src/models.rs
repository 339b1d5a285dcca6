//! Library entity models

use serde::{Deserialize, Serialize};

pub type SongId = i64;
pub type ArtistId = i64;
pub type AlbumId = i64;
pub type PlaylistId = i64;
pub type UserId = i64;

/// Opaque session token
pub type Token = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub name: String,
    /// Credited artists in credit order
    pub artist_ids: Vec<ArtistId>,
    pub is_single: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub artist_ids: Vec<ArtistId>,
    pub song_ids: Vec<SongId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub user_id: UserId,
    pub song_ids: Vec<SongId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// Live login of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub token: Token,
    /// Unix epoch milliseconds
    pub issued_at: i64,
}

/// Kinds of entity that can appear in an activity feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Song,
    Album,
    Playlist,
}

impl EntityKind {
    /// Persisted discriminant
    pub fn code(self) -> i64 {
        match self {
            EntityKind::Song => 0,
            EntityKind::Album => 1,
            EntityKind::Playlist => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(EntityKind::Song),
            1 => Some(EntityKind::Album),
            2 => Some(EntityKind::Playlist),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Song => "song",
            EntityKind::Album => "album",
            EntityKind::Playlist => "playlist",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "song" => Ok(EntityKind::Song),
            "album" => Ok(EntityKind::Album),
            "playlist" => Ok(EntityKind::Playlist),
            other => Err(crate::Error::Validation(format!(
                "unknown entity kind '{}'",
                other
            ))),
        }
    }
}

/// Reference to a feed-able entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn song(id: SongId) -> Self {
        Self::new(EntityKind::Song, id)
    }

    pub fn album(id: AlbumId) -> Self {
        Self::new(EntityKind::Album, id)
    }

    pub fn playlist(id: PlaylistId) -> Self {
        Self::new(EntityKind::Playlist, id)
    }
}

/// Resolved feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LibraryEntity {
    Song(Song),
    Album(Album),
    Playlist(Playlist),
}

impl From<&Song> for EntityRef {
    fn from(song: &Song) -> Self {
        EntityRef::song(song.id)
    }
}

impl From<&Album> for EntityRef {
    fn from(album: &Album) -> Self {
        EntityRef::album(album.id)
    }
}

impl From<&Playlist> for EntityRef {
    fn from(playlist: &Playlist) -> Self {
        EntityRef::playlist(playlist.id)
    }
}

/// Appended activity record
///
/// `user_id` is set for per-user "recent" events and `None` for the global
/// "new" feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub id: i64,
    pub user_id: Option<UserId>,
    /// Unix epoch milliseconds
    pub timestamp: i64,
    pub entity: EntityRef,
}
