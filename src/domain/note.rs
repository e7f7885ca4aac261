//! Note and chunk representations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unique identifier for a note.
///
/// Derived as the MD5 hex digest of the note's path relative to the
/// ingestion root, so the same file always maps to the same id.
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Derive the id for a file path relative to the ingestion root.
    pub fn for_relative_path(relative_path: &Path) -> Self {
        let digest = md5::compute(relative_path.to_string_lossy().as_bytes());
        Self(format!("{:x}", digest))
    }

    /// Create a NoteId from an already-derived string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Target of a wiki-link or embed found in note content.
///
/// Wiki-links usually point at other notes, but they can also name images
/// and drawings. Assets are carried as opaque vault-relative paths and are
/// never graph nodes. Serializes to the persisted string form: a bare note
/// id, `image:<path>`, or `excalidraw:<path>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkTarget {
    /// Another note, by id.
    Note(NoteId),
    /// An image file, by path relative to the ingestion root.
    Image(String),
    /// An excalidraw drawing, by path relative to the ingestion root.
    Drawing(String),
}

impl LinkTarget {
    /// The note id, if this target is a note.
    pub fn as_note(&self) -> Option<&NoteId> {
        match self {
            LinkTarget::Note(id) => Some(id),
            _ => None,
        }
    }

    /// Whether this target is an asset (image or drawing) rather than a note.
    pub fn is_asset(&self) -> bool {
        !matches!(self, LinkTarget::Note(_))
    }
}

impl From<String> for LinkTarget {
    fn from(s: String) -> Self {
        if let Some(path) = s.strip_prefix("image:") {
            LinkTarget::Image(path.to_string())
        } else if let Some(path) = s.strip_prefix("excalidraw:") {
            LinkTarget::Drawing(path.to_string())
        } else {
            LinkTarget::Note(NoteId::from(s))
        }
    }
}

impl From<LinkTarget> for String {
    fn from(target: LinkTarget) -> Self {
        match target {
            LinkTarget::Note(id) => id.0,
            LinkTarget::Image(path) => format!("image:{}", path),
            LinkTarget::Drawing(path) => format!("excalidraw:{}", path),
        }
    }
}

impl std::fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkTarget::Note(id) => write!(f, "{}", id),
            LinkTarget::Image(path) => write!(f, "image:{}", path),
            LinkTarget::Drawing(path) => write!(f, "excalidraw:{}", path),
        }
    }
}

/// A full, non-chunked note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier (MD5 of the root-relative path).
    pub id: NoteId,
    /// Title: first `# ...` heading when content starts with one, else the file stem.
    pub title: String,
    /// Path of the source file on disk.
    pub source_path: String,
    /// Markdown content with image references rewritten to API URLs.
    pub content: String,
    /// Filesystem creation time.
    pub created: DateTime<Utc>,
    /// Filesystem modification time at last ingestion.
    pub modified: DateTime<Utc>,
    /// Resolved wiki-link targets, in document order.
    #[serde(default)]
    pub outbound_links: Vec<LinkTarget>,
    /// Ids of notes that link to this one. Rebuilt each ingestion pass.
    #[serde(default)]
    pub inbound_links: Vec<NoteId>,
    /// SHA-256 hashes of embed reference strings (`![[...]]`).
    #[serde(default)]
    pub embedded_refs: Vec<String>,
    /// Tags extracted from content or path.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Folder the note lives in, relative to the ingestion root. Empty at root.
    #[serde(default)]
    pub folder_path: String,
}

/// A token-bounded slice of a note, the unit of vector search.
///
/// This is the vectorless shape returned to retrieval callers; the stored
/// form is [`EmbeddedChunk`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk id, `"{note_id}_{ordinal}"`.
    pub id: String,
    /// Owning note.
    pub note_id: NoteId,
    /// Title of the owning note.
    pub title: String,
    /// Chunk text, including any prepended overlap context.
    pub text: String,
    /// Byte offset of the original (pre-overlap) slice in the note content.
    pub start_pos: usize,
    /// Byte offset one past the end of the original slice.
    pub end_pos: usize,
}

/// A chunk together with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub id: String,
    pub note_id: NoteId,
    pub title: String,
    pub text: String,
    pub start_pos: usize,
    pub end_pos: usize,
    /// Embedding, stored as a plain float array.
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    /// Drop the vector, keeping the retrieval-facing fields.
    pub fn without_vector(&self) -> Chunk {
        Chunk {
            id: self.id.clone(),
            note_id: self.note_id.clone(),
            title: self.title.clone(),
            text: self.text.clone(),
            start_pos: self.start_pos,
            end_pos: self.end_pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_id_is_stable_for_a_path() {
        let a = NoteId::for_relative_path(Path::new("journal/2024.md"));
        let b = NoteId::for_relative_path(Path::new("journal/2024.md"));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn note_id_differs_across_paths() {
        let a = NoteId::for_relative_path(Path::new("a.md"));
        let b = NoteId::for_relative_path(Path::new("b.md"));
        assert_ne!(a, b);
    }

    #[test]
    fn link_target_round_trips_through_strings() {
        let note = LinkTarget::Note(NoteId::from("abc123"));
        let image = LinkTarget::Image("Z - Attachements/pic.png".to_string());
        let drawing = LinkTarget::Drawing("sketch.excalidraw".to_string());

        for target in [note, image, drawing] {
            let s: String = target.clone().into();
            assert_eq!(LinkTarget::from(s), target);
        }
    }

    #[test]
    fn link_target_serializes_as_plain_string() {
        let image = LinkTarget::Image("pic.png".to_string());
        let json = serde_json::to_string(&image).unwrap();
        assert_eq!(json, "\"image:pic.png\"");

        let back: LinkTarget = serde_json::from_str("\"deadbeef\"").unwrap();
        assert_eq!(back, LinkTarget::Note(NoteId::from("deadbeef")));
    }

    #[test]
    fn embedded_chunk_strips_to_chunk() {
        let embedded = EmbeddedChunk {
            id: "n_0".to_string(),
            note_id: NoteId::from("n"),
            title: "T".to_string(),
            text: "body".to_string(),
            start_pos: 0,
            end_pos: 4,
            vector: vec![0.1, 0.2],
        };
        let chunk = embedded.without_vector();
        assert_eq!(chunk.id, "n_0");
        assert_eq!(chunk.text, "body");
    }
}
