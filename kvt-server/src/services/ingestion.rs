//! Background ingestion of staged audio files
//!
//! The pipeline alternates between two states. While `Scanning` it walks the
//! direct children of the staging directory in file-name order; while
//! `Sleeping` it waits for the scan interval. Cancellation is checked before
//! every file, while waiting on metadata confirmation, and ends the sleep
//! early.
//!
//! Per file: read the bytes, parse tags (blocking pool), confirm metadata,
//! resolve the song, write audio (and single artwork) under the song id, then
//! delete the source. A file whose processing fails stays where it is and is
//! picked up again next cycle.

use crate::services::confirm::{Confirmation, MetadataConfirmer, MetadataProposal};
use crate::services::dedup_resolver::{DedupResolver, RawSong, Resolution};
use crate::services::file_store::{ArtworkKind, FileStore};
use crate::services::tag_parser::TagParser;
use crate::store::LibraryStore;
use kvt_common::models::{EntityRef, SongId};
use kvt_common::{Error, ErrorKind, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Scanning,
    Sleeping,
}

/// Counts for one scan cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Songs written as new rows
    pub created: usize,
    /// Files that resolved to a song already in the library
    pub existing: usize,
    /// Files without a readable tag (left in place)
    pub untagged: usize,
    /// Files rejected by validation (left in place)
    pub invalid: usize,
    /// Files whose processing failed (left in place)
    pub failed: usize,
    /// Subdirectories seen and not processed
    pub directories: usize,
    pub cancelled: bool,
}

impl CycleReport {
    pub fn processed(&self) -> usize {
        self.created + self.existing
    }
}

/// Result of handling one staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Created(SongId),
    Existing(SongId),
    Untagged,
}

pub struct IngestionPipeline {
    staging_dir: PathBuf,
    scan_interval: Duration,
    store: Arc<dyn LibraryStore>,
    resolver: DedupResolver,
    files: Arc<dyn FileStore>,
    tags: Arc<dyn TagParser>,
    confirmer: Arc<dyn MetadataConfirmer>,
    state: watch::Sender<PipelineState>,
}

impl IngestionPipeline {
    pub fn new(
        staging_dir: impl Into<PathBuf>,
        store: Arc<dyn LibraryStore>,
        files: Arc<dyn FileStore>,
        tags: Arc<dyn TagParser>,
        confirmer: Arc<dyn MetadataConfirmer>,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Sleeping);
        Self {
            staging_dir: staging_dir.into(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            resolver: DedupResolver::new(Arc::clone(&store)),
            store,
            files,
            tags,
            confirmer,
            state,
        }
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: PipelineState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "Pipeline state changed");
        }
    }

    /// Scan, sleep, repeat until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            staging_dir = %self.staging_dir.display(),
            interval_secs = self.scan_interval.as_secs(),
            "Ingestion pipeline started"
        );

        loop {
            match self.scan_once(&cancel).await {
                Ok(report) => info!(
                    created = report.created,
                    existing = report.existing,
                    untagged = report.untagged,
                    invalid = report.invalid,
                    failed = report.failed,
                    directories = report.directories,
                    "Scan cycle complete"
                ),
                Err(e) => error!(error = %e, "Scan cycle failed"),
            }

            if cancel.is_cancelled() {
                break;
            }

            self.set_state(PipelineState::Sleeping);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.scan_interval) => {}
            }
        }

        self.set_state(PipelineState::Sleeping);
        info!("Ingestion pipeline stopped");
    }

    /// Run a single scan cycle over the staging directory
    pub async fn scan_once(&self, cancel: &CancellationToken) -> Result<CycleReport> {
        self.set_state(PipelineState::Scanning);
        let mut report = CycleReport::default();

        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let entries = list_sorted(&self.staging_dir).await?;

        for (path, is_dir) in entries {
            if cancel.is_cancelled() {
                info!("Scan cancelled");
                report.cancelled = true;
                break;
            }

            if is_dir {
                info!(dir = %path.display(), "Found directory, albums are not ingested");
                report.directories += 1;
                continue;
            }

            match self.process_file(&path, cancel).await {
                Ok(FileOutcome::Created(song_id)) => {
                    info!(file = %path.display(), song_id, "Ingested new song");
                    report.created += 1;
                }
                Ok(FileOutcome::Existing(song_id)) => {
                    info!(file = %path.display(), song_id, "File matched existing song");
                    report.existing += 1;
                }
                Ok(FileOutcome::Untagged) => {
                    warn!(file = %path.display(), "Could not read tags, leaving file in place");
                    report.untagged += 1;
                }
                Err(e) => match e.kind() {
                    ErrorKind::Validation => {
                        warn!(file = %path.display(), error = %e, "Skipping file this cycle");
                        report.invalid += 1;
                    }
                    ErrorKind::Cancelled => {
                        info!(file = %path.display(), "Scan cancelled mid-file");
                        report.cancelled = true;
                        break;
                    }
                    _ => {
                        error!(file = %path.display(), error = %e, "Ingest failed, will retry next cycle");
                        report.failed += 1;
                    }
                },
            }
        }

        Ok(report)
    }

    async fn process_file(&self, path: &Path, cancel: &CancellationToken) -> Result<FileOutcome> {
        let bytes = tokio::fs::read(path).await?;

        let parser = Arc::clone(&self.tags);
        let (bytes, tag) = tokio::task::spawn_blocking(move || {
            let tag = parser.parse(&bytes);
            (bytes, tag)
        })
        .await
        .map_err(|e| Error::Internal(format!("tag parser task failed: {}", e)))?;

        let Some(tag) = tag else {
            return Ok(FileOutcome::Untagged);
        };

        let proposal = MetadataProposal {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            title: tag.title.clone(),
            artist: tag.artist.clone(),
        };

        // Operator prompts may stay unanswered until shutdown
        let confirmation = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled(format!(
                    "confirmation of {} abandoned",
                    proposal.file_name
                )));
            }
            answer = self.confirmer.confirm(&proposal) => answer?,
        };

        let (name, artists) = match confirmation {
            Confirmation::Accept => (tag.title, vec![tag.artist]),
            Confirmation::Correct { name, artists } => (name, artists),
        };

        let raw = RawSong {
            name,
            artists,
            is_single: true,
            audio: bytes,
            artwork: tag.image,
        };

        let resolution = self.resolver.add_song(&raw).await?;
        let song = resolution.song();

        self.files.write_song_bytes(song.id, &raw.audio).await?;
        if let Some(artwork) = raw.single_artwork() {
            self.files
                .write_artwork_bytes(ArtworkKind::Song, song.id, artwork)
                .await?;
        }

        if resolution.is_created() {
            if let Err(e) = self.store.add_new_entity(EntityRef::song(song.id)).await {
                warn!(song_id = song.id, error = %e, "Failed to append song to new feed");
            }
        }

        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(
                file = %path.display(),
                error = %e,
                "Failed to delete ingested file, it will be reprocessed"
            );
        }

        Ok(match resolution {
            Resolution::Created(song) => FileOutcome::Created(song.id),
            Resolution::Existing(song) => FileOutcome::Existing(song.id),
        })
    }
}

/// Direct children of `dir` sorted by file name, flagged when a directory
async fn list_sorted(dir: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((entry.path(), is_dir));
    }
    entries.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(entries)
}
