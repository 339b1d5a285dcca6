//! Song dedup resolution
//!
//! Turns raw ingestion input into a canonical Song row. A song whose
//! sanitized name already exists is returned as-is; otherwise every credited
//! artist is matched against the store (or created) and a new Song row is
//! written with the artist ids in input order.
//!
//! Artist searches run concurrently, each tagged with its position in the
//! input list, and are fanned back in by that position. Failures are not
//! rolled back: artists created before a later failure stay committed.

use crate::executor::{join_all, ComposeExt};
use crate::store::LibraryStore;
use kvt_common::models::{Artist, ArtistId, Song};
use kvt_common::{sanitize, Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Raw ingestion input
#[derive(Debug, Clone, Default)]
pub struct RawSong {
    pub name: String,
    /// Credited artist names in credit order (may hold duplicates or blanks)
    pub artists: Vec<String>,
    pub is_single: bool,
    pub audio: Vec<u8>,
    pub artwork: Option<Vec<u8>>,
}

impl RawSong {
    /// Artwork worth persisting: present, non-empty and on a single
    pub fn single_artwork(&self) -> Option<&[u8]> {
        if !self.is_single {
            return None;
        }
        self.artwork.as_deref().filter(|bytes| !bytes.is_empty())
    }
}

/// Outcome of resolving a raw song
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A new Song row was written
    Created(Song),
    /// A song with the same sanitized name already existed
    Existing(Song),
}

impl Resolution {
    pub fn song(&self) -> &Song {
        match self {
            Resolution::Created(song) | Resolution::Existing(song) => song,
        }
    }

    pub fn into_song(self) -> Song {
        match self {
            Resolution::Created(song) | Resolution::Existing(song) => song,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Distinct unmatched artist name and the positions that credit it
struct PendingArtist {
    name: String,
    positions: Vec<usize>,
}

pub struct DedupResolver {
    store: Arc<dyn LibraryStore>,
}

impl DedupResolver {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Resolve `raw` into a Song, creating artists and the song as needed
    pub async fn add_song(&self, raw: &RawSong) -> Result<Resolution> {
        let wanted = sanitize(&raw.name);
        if wanted.is_empty() {
            return Err(Error::Validation(format!(
                "song name '{}' is blank after sanitizing",
                raw.name
            )));
        }

        if let Some(existing) = self.find_song(&raw.name, &wanted).await? {
            debug!(song_id = existing.id, name = %raw.name, "Song already in library");
            return Ok(Resolution::Existing(existing));
        }

        let artist_names: Vec<&str> = raw
            .artists
            .iter()
            .map(String::as_str)
            .filter(|name| !sanitize(name).is_empty())
            .collect();

        let artist_ids = self.resolve_artists(&artist_names).await?;

        match self
            .store
            .create_song(&raw.name, &artist_ids, raw.is_single)
            .await
        {
            Ok(song) => Ok(Resolution::Created(song)),
            Err(Error::Conflict(reason)) => {
                // Another writer created the same song after our search
                debug!(name = %raw.name, %reason, "Song creation raced, adopting existing row");
                self.find_song(&raw.name, &wanted)
                    .await?
                    .map(Resolution::Existing)
                    .ok_or(Error::Conflict(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Existing song whose sanitized name equals `wanted`
    async fn find_song(&self, name: &str, wanted: &str) -> Result<Option<Song>> {
        Ok(self
            .store
            .search_songs(name)
            .await?
            .into_iter()
            .find(|song| sanitize(&song.name) == wanted))
    }

    /// Artist id per input position, reusing matches and creating the rest
    async fn resolve_artists(&self, names: &[&str]) -> Result<Vec<ArtistId>> {
        let searches = names.iter().enumerate().map(|(index, name)| {
            self.store
                .search_artists(name)
                .compose(move |result| async move { result.map(|matches| (index, matches)) })
        });
        let tagged: Vec<(usize, Vec<Artist>)> = join_all(searches).await?;

        let mut slots: Vec<Option<ArtistId>> = vec![None; names.len()];
        let mut pending: Vec<PendingArtist> = Vec::new();

        for (index, matches) in tagged {
            match matches.iter().map(|artist| artist.id).min() {
                Some(id) => slots[index] = Some(id),
                None => {
                    let key = sanitize(names[index]);
                    match pending.iter_mut().find(|p| sanitize(&p.name) == key) {
                        Some(existing) => existing.positions.push(index),
                        None => pending.push(PendingArtist {
                            name: names[index].to_string(),
                            positions: vec![index],
                        }),
                    }
                }
            }
        }

        let creations = pending.iter().map(|p| self.create_or_adopt_artist(&p.name));
        let created = join_all(creations).await?;

        for (artist, id) in pending.iter().zip(created) {
            for &position in &artist.positions {
                slots[position] = Some(id);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    Error::Internal(format!("artist position {} left unresolved", index))
                })
            })
            .collect()
    }

    async fn create_or_adopt_artist(&self, name: &str) -> Result<ArtistId> {
        match self.store.add_artist(name).await {
            Ok(artist) => Ok(artist.id),
            Err(Error::Conflict(reason)) => {
                let wanted = sanitize(name);
                let adopted = self
                    .store
                    .search_artists(name)
                    .await?
                    .into_iter()
                    .find(|artist| sanitize(&artist.name) == wanted)
                    .ok_or(Error::Conflict(reason))?;
                info!(artist_id = adopted.id, name, "Artist creation raced, adopting existing row");
                Ok(adopted.id)
            }
            Err(e) => Err(e),
        }
    }
}
