//! Rhizome: ingestion and retrieval engine for a personal Markdown vault.
//!
//! Turns a folder of Markdown notes (with embedded images, wiki-style
//! cross-links, and drawings) into a persistent, queryable index: notes,
//! token-bounded text chunks with vector embeddings, content-addressed
//! media, and a typed inter-note relationship graph.
//!
//! # Core concepts
//!
//! - **Notes**: one per markdown file, identified by the MD5 of the
//!   root-relative path, carrying rewritten content and link lists
//! - **Chunks**: token-bounded slices of a note, each with an embedding;
//!   the unit of nearest-neighbor retrieval
//! - **Relationships**: directed typed edges derived from wiki-links, plus
//!   folder clusters; rebuilt wholesale on every ingestion pass
//!
//! The embedding provider is a capability ([`Embedder`]) injected at
//! construction; the engine never instantiates clients itself.

pub mod config;
pub mod domain;
pub mod embed;
pub mod ingest;
pub mod relations;
pub mod store;

pub use config::{ConfigError, Settings};
pub use domain::{
    Chunk, EmbeddedChunk, Image, LinkTarget, Note, NoteId, NoteRelationship, RelationshipGraph,
    RelationshipKind,
};
pub use embed::{EmbedError, Embedder, OpenAiEmbedder, VoyageEmbedder};
pub use ingest::{
    ChunkText, ContentExtractor, IngestError, IngestOptions, IngestReport, IngestionOrchestrator,
    NameIndex, PathResolver, TextChunker,
};
pub use relations::RelationshipGraphBuilder;
pub use store::{MediaStore, StoreError, StoreResult, VectorStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
