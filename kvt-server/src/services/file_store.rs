//! Audio and artwork byte storage
//!
//! Layout under the library root:
//! - `indexed/{song_id}.mp3`
//! - `artwork/{kind}/{id}.jpg` with kind `song`, `album` or `playlist`
//!
//! Writes go to a `.part` file that is renamed into place, so repeating a
//! write replaces the previous bytes atomically.

use async_trait::async_trait;
use kvt_common::models::SongId;
use kvt_common::{Error, Result};
use std::path::{Path, PathBuf};

/// Owner of an artwork file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtworkKind {
    Song,
    Album,
    Playlist,
}

impl ArtworkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtworkKind::Song => "song",
            ArtworkKind::Album => "album",
            ArtworkKind::Playlist => "playlist",
        }
    }
}

impl std::fmt::Display for ArtworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtworkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "song" => Ok(ArtworkKind::Song),
            "album" => Ok(ArtworkKind::Album),
            "playlist" => Ok(ArtworkKind::Playlist),
            other => Err(Error::Validation(format!("unknown artwork kind '{}'", other))),
        }
    }
}

/// File-storage collaborator
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn write_song_bytes(&self, id: SongId, bytes: &[u8]) -> Result<()>;
    async fn write_artwork_bytes(&self, kind: ArtworkKind, id: i64, bytes: &[u8]) -> Result<()>;
    /// `None` when no audio was stored for `id`
    async fn read_song_bytes(&self, id: SongId) -> Result<Option<Vec<u8>>>;
    async fn read_artwork_bytes(&self, kind: ArtworkKind, id: i64) -> Result<Option<Vec<u8>>>;
}

/// Local-disk file store rooted at the library folder
#[derive(Debug, Clone)]
pub struct DiskFileStore {
    root: PathBuf,
}

impl DiskFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn song_path(&self, id: SongId) -> PathBuf {
        self.root.join("indexed").join(format!("{}.mp3", id))
    }

    pub fn artwork_path(&self, kind: ArtworkKind, id: i64) -> PathBuf {
        self.root
            .join("artwork")
            .join(kind.as_str())
            .join(format!("{}.jpg", id))
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Storage(format!("{} has no parent directory", path.display())))?;
    tokio::fs::create_dir_all(parent).await?;

    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    tokio::fs::write(&part, bytes).await?;
    if let Err(e) = tokio::fs::rename(&part, path).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e.into());
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "File written");
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn write_song_bytes(&self, id: SongId, bytes: &[u8]) -> Result<()> {
        write_atomic(&self.song_path(id), bytes).await
    }

    async fn write_artwork_bytes(&self, kind: ArtworkKind, id: i64, bytes: &[u8]) -> Result<()> {
        write_atomic(&self.artwork_path(kind, id), bytes).await
    }

    async fn read_song_bytes(&self, id: SongId) -> Result<Option<Vec<u8>>> {
        read_optional(&self.song_path(id)).await
    }

    async fn read_artwork_bytes(&self, kind: ArtworkKind, id: i64) -> Result<Option<Vec<u8>>> {
        read_optional(&self.artwork_path(kind, id)).await
    }
}
