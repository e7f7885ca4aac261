//! Domain models shared across ingestion, storage, and retrieval.

mod image;
mod note;
mod relationships;

pub use image::Image;
pub use note::{Chunk, EmbeddedChunk, LinkTarget, Note, NoteId};
pub use relationships::{NoteRelationship, RelationshipGraph, RelationshipKind};
