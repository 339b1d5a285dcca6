//! Tag extraction from raw audio bytes
//!
//! The pipeline only needs a title, an artist and an optional embedded image.
//! [`LoftyTagParser`] reads them with lofty, preferring the ID3v2 tag and
//! falling back to the file's primary or first tag.

use lofty::file::TaggedFileExt;
use lofty::picture::PictureType;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{Tag, TagType};
use std::io::Cursor;

/// Metadata read from a file's tag
///
/// Missing title or artist frames come back as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTag {
    pub title: String,
    pub artist: String,
    pub image: Option<Vec<u8>>,
}

/// Tag-parsing collaborator
pub trait TagParser: Send + Sync {
    /// `None` when the bytes carry no readable tag
    fn parse(&self, bytes: &[u8]) -> Option<ParsedTag>;
}

#[derive(Debug, Clone, Default)]
pub struct LoftyTagParser;

impl LoftyTagParser {
    pub fn new() -> Self {
        Self
    }
}

impl TagParser for LoftyTagParser {
    fn parse(&self, bytes: &[u8]) -> Option<ParsedTag> {
        let tagged_file = match Probe::new(Cursor::new(bytes)).guess_file_type() {
            Ok(probe) => match probe.read() {
                Ok(file) => file,
                Err(e) => {
                    tracing::debug!(error = %e, "Tag read failed");
                    return None;
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "File type probe failed");
                return None;
            }
        };

        let tag = tagged_file
            .tag(TagType::Id3v2)
            .or_else(|| tagged_file.primary_tag())
            .or_else(|| tagged_file.first_tag())?;

        Some(ParsedTag {
            title: tag.title().map(|s| s.to_string()).unwrap_or_default(),
            artist: tag.artist().map(|s| s.to_string()).unwrap_or_default(),
            image: embedded_image(tag),
        })
    }
}

/// Front cover if present, otherwise the first picture
fn embedded_image(tag: &Tag) -> Option<Vec<u8>> {
    let pictures = tag.pictures();
    pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .map(|p| p.data().to_vec())
        .filter(|data| !data.is_empty())
}
