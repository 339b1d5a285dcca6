//! Ingestion services and their collaborators

pub mod confirm;
pub mod dedup_resolver;
pub mod file_store;
pub mod ingestion;
pub mod tag_parser;

pub use confirm::{AutoConfirm, Confirmation, ConsoleConfirm, MetadataConfirmer, MetadataProposal};
pub use dedup_resolver::{DedupResolver, RawSong, Resolution};
pub use file_store::{ArtworkKind, DiskFileStore, FileStore};
pub use ingestion::{CycleReport, IngestionPipeline, PipelineState};
pub use tag_parser::{LoftyTagParser, ParsedTag, TagParser};
