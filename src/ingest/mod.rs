//! The ingestion pipeline: folder of Markdown notes in, populated vector and
//! media stores out.
//!
//! Passes are incremental: only files whose mtime advanced since the last
//! pass are reprocessed, notes whose files disappeared are deleted, and the
//! relationship graph is rebuilt from scratch every time.

mod chunker;
mod extractor;
mod mapping;
mod orchestrator;
mod resolver;

use thiserror::Error;

pub use chunker::{ChunkText, TextChunker};
pub use extractor::ContentExtractor;
pub use mapping::NameIndex;
pub use orchestrator::{IngestOptions, IngestReport, IngestionOrchestrator};
pub use resolver::PathResolver;

/// Errors that abort an ingestion pass.
///
/// Per-file problems (unresolved references, unknown MIME types, unreadable
/// or non-UTF-8 files, unresolvable wikilinks) are logged and skipped; they
/// never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("folder walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("tokenizer initialization failed: {0}")]
    Tokenizer(String),

    #[error("embedding failed: {0}")]
    Embed(#[from] crate::embed::EmbedError),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}
