//! Vector store: notes, embedded chunks, and the relationship graph.
//!
//! The corpus is small enough that similarity search is an exact scan; no
//! approximate index is kept. All collections are ordered maps so the
//! persisted document is identical across runs over the same data.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::{Chunk, EmbeddedChunk, Note, NoteId, RelationshipGraph};

use super::{write_atomic, StoreError, StoreResult};

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct VectorDocument {
    notes: BTreeMap<NoteId, Note>,
    chunks: BTreeMap<String, EmbeddedChunk>,
    /// Absent in first-version documents; upgrades to an empty graph.
    #[serde(default)]
    relationships: RelationshipGraph,
}

/// Store of notes, embedded chunks, and the inter-note relationship graph,
/// persisted as a single JSON document.
pub struct VectorStore {
    notes: BTreeMap<NoteId, Note>,
    chunks: BTreeMap<String, EmbeddedChunk>,
    /// Chunk ids in insertion order. Similarity ties resolve by this, never
    /// by map key order (lexicographic ids put `n_10` before `n_2`). Not
    /// persisted; rebuilt on load.
    chunk_order: Vec<String>,
    relationships: RelationshipGraph,
    path: Option<PathBuf>,
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore {
    /// Create an empty store with no persistence path.
    pub fn new() -> Self {
        Self {
            notes: BTreeMap::new(),
            chunks: BTreeMap::new(),
            chunk_order: Vec::new(),
            relationships: RelationshipGraph::new(),
            path: None,
        }
    }

    /// Open a store backed by `path`: loads the document when the file
    /// exists, starts empty otherwise.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let mut store = if path.exists() {
            Self::load(&path)?
        } else {
            Self::new()
        };
        store.path = Some(path);
        Ok(store)
    }

    /// Load a store from a JSON document.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = std::fs::read(path)?;
        let document: VectorDocument = serde_json::from_slice(&bytes)?;
        let mut store = Self {
            notes: document.notes,
            chunks: document.chunks,
            chunk_order: Vec::new(),
            relationships: document.relationships,
            path: Some(path.to_path_buf()),
        };
        store.rebuild_chunk_order();
        Ok(store)
    }

    /// Reconstruct insertion order from chunk identity: notes in id order,
    /// each note's chunks by numeric ordinal. Ingestion adds chunks in
    /// exactly this sequence, so a reloaded store scans identically to the
    /// store that saved it.
    fn rebuild_chunk_order(&mut self) {
        let mut order: Vec<String> = self.chunks.keys().cloned().collect();
        order.sort_by(|a, b| {
            let ca = &self.chunks[a];
            let cb = &self.chunks[b];
            (&ca.note_id, chunk_ordinal(a)).cmp(&(&cb.note_id, chunk_ordinal(b)))
        });
        self.chunk_order = order;
    }

    /// Persist to `path`, or to the configured path when `None`.
    pub fn save(&self, path: Option<&Path>) -> StoreResult<()> {
        let target = path
            .or(self.path.as_deref())
            .ok_or(StoreError::NoPathConfigured)?;

        let document = VectorDocument {
            notes: self.notes.clone(),
            chunks: self.chunks.clone(),
            relationships: self.relationships.clone(),
        };
        let bytes = serde_json::to_vec(&document)?;
        write_atomic(target, &bytes)?;
        debug!(
            path = %target.display(),
            notes = self.notes.len(),
            chunks = self.chunks.len(),
            "vector store saved"
        );
        Ok(())
    }

    // --- Retrieval ---------------------------------------------------------

    /// The `k` chunks whose vectors are closest to `query` by cosine
    /// similarity, best first, stripped of their vectors.
    ///
    /// Exact scan over every stored chunk in insertion order; the sort is
    /// stable, so equal similarities keep insertion order.
    pub fn closest(&self, query: &[f32], k: usize) -> Vec<Chunk> {
        let mut scored: Vec<(f32, &EmbeddedChunk)> = self
            .chunk_order
            .iter()
            .filter_map(|id| self.chunks.get(id))
            .map(|chunk| (cosine_similarity(query, &chunk.vector), chunk))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(_, chunk)| chunk.without_vector())
            .collect()
    }

    /// Get a note by id.
    pub fn get_note(&self, note_id: &NoteId) -> Option<&Note> {
        self.notes.get(note_id)
    }

    /// Find a note by title, trying strategies from exact to fuzzy:
    /// exact title, case-insensitive title, space/underscore-normalized
    /// title, source-path stem, then substring containment.
    pub fn find_by_title(&self, title: &str) -> Option<&Note> {
        let lowered = title.to_lowercase();
        let normalized = lowered.replace(' ', "_");

        self.notes
            .values()
            .find(|n| n.title == title)
            .or_else(|| self.notes.values().find(|n| n.title.to_lowercase() == lowered))
            .or_else(|| {
                self.notes
                    .values()
                    .find(|n| n.title.to_lowercase().replace(' ', "_") == normalized)
            })
            .or_else(|| {
                self.notes.values().find(|n| {
                    let stem = Path::new(&n.source_path)
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_lowercase())
                        .unwrap_or_default();
                    stem == lowered || stem == normalized
                })
            })
            .or_else(|| {
                self.notes
                    .values()
                    .find(|n| n.title.to_lowercase().contains(&lowered))
            })
    }

    // --- Graph traversal ---------------------------------------------------

    /// Notes reachable from `note_id` within `max_depth` hops over the
    /// undirected union of outbound and inbound links, in BFS visit order,
    /// excluding the source note.
    pub fn related(&self, note_id: &NoteId, max_depth: usize) -> Vec<Note> {
        if !self.notes.contains_key(note_id) {
            return Vec::new();
        }

        let mut visited: HashSet<NoteId> = HashSet::new();
        let mut related = Vec::new();
        let mut queue: VecDeque<(NoteId, usize)> = VecDeque::new();

        visited.insert(note_id.clone());
        queue.push_back((note_id.clone(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth > 0 {
                if let Some(note) = self.notes.get(&current) {
                    related.push(note.clone());
                }
            }

            if depth < max_depth {
                if let Some(note) = self.notes.get(&current) {
                    for neighbor in Self::neighbors(note) {
                        if visited.insert(neighbor.clone()) {
                            queue.push_back((neighbor, depth + 1));
                        }
                    }
                }
            }
        }

        related
    }

    /// All notes sharing the source note's folder, excluding the source.
    pub fn cluster(&self, note_id: &NoteId) -> Vec<Note> {
        let Some(note) = self.notes.get(note_id) else {
            return Vec::new();
        };
        if note.folder_path.is_empty() {
            return Vec::new();
        }

        self.relationships
            .clusters
            .get(&note.folder_path)
            .map(|ids| {
                ids.iter()
                    .filter(|id| *id != note_id)
                    .filter_map(|id| self.notes.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shortest path between two notes over the undirected link graph.
    ///
    /// Returns `[source]` when source and target coincide, and an empty
    /// sequence when either endpoint is unknown or no path exists.
    pub fn path(&self, source: &NoteId, target: &NoteId) -> Vec<NoteId> {
        if !self.notes.contains_key(source) || !self.notes.contains_key(target) {
            return Vec::new();
        }
        if source == target {
            return vec![source.clone()];
        }

        let mut visited: HashSet<NoteId> = HashSet::new();
        let mut queue: VecDeque<(NoteId, Vec<NoteId>)> = VecDeque::new();

        visited.insert(source.clone());
        queue.push_back((source.clone(), vec![source.clone()]));

        while let Some((current, path)) = queue.pop_front() {
            let Some(note) = self.notes.get(&current) else {
                continue;
            };
            for neighbor in Self::neighbors(note) {
                if &neighbor == target {
                    let mut found = path.clone();
                    found.push(neighbor);
                    return found;
                }
                if self.notes.contains_key(&neighbor) && visited.insert(neighbor.clone()) {
                    let mut next = path.clone();
                    next.push(neighbor.clone());
                    queue.push_back((neighbor, next));
                }
            }
        }

        Vec::new()
    }

    /// Context text of the first relationship from `source` to `target`,
    /// empty when none exists.
    pub fn context(&self, source: &NoteId, target: &NoteId) -> String {
        self.relationships
            .relationships
            .iter()
            .find(|r| &r.source_note_id == source && &r.target_note_id == target)
            .map(|r| r.context.clone())
            .unwrap_or_default()
    }

    /// The current relationship graph.
    pub fn relationship_graph(&self) -> &RelationshipGraph {
        &self.relationships
    }

    /// Note-id neighbors of a note: outbound note links plus inbound links.
    /// Asset targets are not graph nodes.
    fn neighbors(note: &Note) -> impl Iterator<Item = NoteId> + '_ {
        note.outbound_links
            .iter()
            .filter_map(|t| t.as_note().cloned())
            .chain(note.inbound_links.iter().cloned())
    }

    // --- Mutation (orchestrator only) --------------------------------------

    /// Insert or replace a note.
    pub fn upsert_note(&mut self, note: Note) {
        self.notes.insert(note.id.clone(), note);
    }

    /// Remove a note and every chunk that belongs to it.
    pub fn delete_note(&mut self, note_id: &NoteId) {
        self.notes.remove(note_id);
        self.delete_chunks_for_note(note_id);
    }

    /// Add an embedded chunk. Replacing an existing id keeps its position
    /// in insertion order.
    pub fn add_chunk(&mut self, chunk: EmbeddedChunk) {
        let id = chunk.id.clone();
        if self.chunks.insert(id.clone(), chunk).is_none() {
            self.chunk_order.push(id);
        }
    }

    /// Remove every chunk belonging to a note.
    pub fn delete_chunks_for_note(&mut self, note_id: &NoteId) {
        self.chunks.retain(|_, chunk| &chunk.note_id != note_id);
        self.chunk_order.retain(|id| self.chunks.contains_key(id));
    }

    /// Replace the relationship graph wholesale.
    pub fn replace_relationship_graph(&mut self, graph: RelationshipGraph) {
        self.relationships = graph;
    }

    /// Drop all notes, chunks, and relationships.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.chunks.clear();
        self.chunk_order.clear();
        self.relationships = RelationshipGraph::new();
    }

    /// Ids of all stored notes.
    pub fn note_ids(&self) -> Vec<NoteId> {
        self.notes.keys().cloned().collect()
    }

    /// Clones of the notes with the given ids; unknown ids are skipped.
    pub fn notes_by_ids(&self, ids: &[NoteId]) -> Vec<Note> {
        ids.iter()
            .filter_map(|id| self.notes.get(id).cloned())
            .collect()
    }

    /// Iterate over all stored notes.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    /// Iterate over all stored chunks.
    pub fn chunks(&self) -> impl Iterator<Item = &EmbeddedChunk> {
        self.chunks.values()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Ordinal suffix of a `"{note_id}_{ordinal}"` chunk id.
fn chunk_ordinal(id: &str) -> u64 {
    id.rsplit('_')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Cosine similarity between two vectors; zero when either norm is zero.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
