//! Typed relationships between notes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::NoteId;

/// Kind of inter-note relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Explicit `[[target]]` link in the source note.
    Wikilink,
    /// `![[target]]` embed of another note's content.
    Embed,
    /// Notes sharing the same folder.
    FolderSibling,
    /// Notes adjacent in time.
    Temporal,
}

/// A directed edge between two notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRelationship {
    pub source_note_id: NoteId,
    pub target_note_id: NoteId,
    pub kind: RelationshipKind,
    /// Short text surrounding the first mention of the target in the source.
    #[serde(default)]
    pub context: String,
    /// Edge weight in `[0, 1]`.
    pub strength: f32,
}

/// The complete relationship graph, rebuilt on every ingestion pass.
///
/// Stored as a flat edge list plus folder clusters; traversal walks ids,
/// never object references, so cycles are harmless. `BTreeMap` keeps the
/// persisted document deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    #[serde(default)]
    pub relationships: Vec<NoteRelationship>,
    /// Folder path -> ids of the notes in that folder.
    #[serde(default)]
    pub clusters: BTreeMap<String, Vec<NoteId>>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edges leaving or entering the given note.
    pub fn edges_touching<'a>(
        &'a self,
        note_id: &'a NoteId,
    ) -> impl Iterator<Item = &'a NoteRelationship> {
        self.relationships
            .iter()
            .filter(move |r| &r.source_note_id == note_id || &r.target_note_id == note_id)
    }
}
