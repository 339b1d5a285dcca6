//! In-test collaborators

use async_trait::async_trait;
use kvt_common::models::SongId;
use kvt_common::{Error, Result};
use kvt_server::services::{
    ArtworkKind, Confirmation, FileStore, MetadataConfirmer, MetadataProposal, ParsedTag,
    TagParser,
};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const FAKE_COVER: &[u8] = b"COVER-JPEG";

/// Bytes that [`FakeTagParser`] reads as a tagged file
///
/// Layout: `TAG:<title>|<artist>[|cover]` followed by filler audio.
pub fn tagged_bytes(title: &str, artist: &str, with_cover: bool) -> Vec<u8> {
    let mut header = format!("TAG:{}|{}", title, artist);
    if with_cover {
        header.push_str("|cover");
    }
    header.push('\n');
    let mut bytes = header.into_bytes();
    bytes.extend_from_slice(&[0xAA; 32]);
    bytes
}

/// Tag parser that understands [`tagged_bytes`]
#[derive(Debug, Default)]
pub struct FakeTagParser;

impl TagParser for FakeTagParser {
    fn parse(&self, bytes: &[u8]) -> Option<ParsedTag> {
        let rest = bytes.strip_prefix(b"TAG:")?;
        let end = rest.iter().position(|&b| b == b'\n')?;
        let header = std::str::from_utf8(&rest[..end]).ok()?;

        let mut fields = header.split('|');
        let title = fields.next()?.to_string();
        let artist = fields.next().unwrap_or_default().to_string();
        let image = match fields.next() {
            Some("cover") => Some(FAKE_COVER.to_vec()),
            _ => None,
        };

        Some(ParsedTag {
            title,
            artist,
            image,
        })
    }
}

/// Confirmer that replays queued answers, then accepts
#[derive(Debug, Default)]
pub struct CannedConfirmer {
    answers: Mutex<VecDeque<Confirmation>>,
    seen: Mutex<Vec<MetadataProposal>>,
}

impl CannedConfirmer {
    pub fn new(answers: Vec<Confirmation>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<MetadataProposal> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataConfirmer for CannedConfirmer {
    async fn confirm(&self, proposal: &MetadataProposal) -> Result<Confirmation> {
        self.seen.lock().unwrap().push(proposal.clone());
        Ok(self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Confirmation::Accept))
    }
}

/// File store whose writes always fail
#[derive(Debug, Default)]
pub struct FailingFileStore;

#[async_trait]
impl FileStore for FailingFileStore {
    async fn write_song_bytes(&self, id: SongId, _bytes: &[u8]) -> Result<()> {
        Err(Error::Storage(format!("disk full writing song {}", id)))
    }

    async fn write_artwork_bytes(&self, kind: ArtworkKind, id: i64, _bytes: &[u8]) -> Result<()> {
        Err(Error::Storage(format!("disk full writing {} artwork {}", kind, id)))
    }

    async fn read_song_bytes(&self, _id: SongId) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn read_artwork_bytes(&self, _kind: ArtworkKind, _id: i64) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}
