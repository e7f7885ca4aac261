//! Orchestration of the complete ingestion pipeline.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::{EmbeddedChunk, Note, NoteId};
use crate::embed::Embedder;
use crate::relations::RelationshipGraphBuilder;
use crate::store::{MediaStore, VectorStore};

use super::chunker::TextChunker;
use super::extractor::ContentExtractor;
use super::mapping::NameIndex;
use super::resolver::PathResolver;
use super::IngestError;

/// Tunables for an ingestion pass. A value object handed to the orchestrator
/// at construction; there is no process-wide configuration.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Maximum BPE tokens per chunk.
    pub max_tokens: usize,
    /// Tokens of context carried from the previous chunk.
    pub overlap: usize,
    /// Folder names searched for shared attachments.
    pub attachment_folders: Vec<String>,
    /// Concurrent embedding requests in flight.
    pub embed_concurrency: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            overlap: 100,
            attachment_folders: vec!["Z - Attachements".to_string()],
            embed_concurrency: 8,
        }
    }
}

/// Summary of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub total_files: usize,
    pub modified_files: usize,
    pub deleted_notes: usize,
    pub chunks_created: usize,
    pub relationships: usize,
    pub clusters: usize,
}

/// Drives one incremental pass over a notes folder: change detection,
/// extraction, chunking, embedding, relationship building, persistence.
///
/// Borrows both stores for the duration of the pass; nothing is retained
/// past commit.
pub struct IngestionOrchestrator<'a> {
    embedder: &'a dyn Embedder,
    vector: &'a mut VectorStore,
    media: &'a mut MediaStore,
    options: IngestOptions,
    chunker: TextChunker,
    extractor: ContentExtractor,
    builder: RelationshipGraphBuilder,
}

impl<'a> IngestionOrchestrator<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        vector: &'a mut VectorStore,
        media: &'a mut MediaStore,
        options: IngestOptions,
    ) -> Result<Self, IngestError> {
        let chunker = TextChunker::new(options.max_tokens, options.overlap)?;
        Ok(Self {
            embedder,
            vector,
            media,
            options,
            chunker,
            extractor: ContentExtractor::new(),
            builder: RelationshipGraphBuilder::new(),
        })
    }

    /// Run one pass over `folder`, then persist both stores.
    ///
    /// Aborting before the final save leaves the on-disk snapshots untouched;
    /// the caller can simply reload and retry.
    pub async fn ingest(&mut self, folder: &Path) -> Result<IngestReport, IngestError> {
        let files = markdown_files(folder)?;
        let modified = self.modified_files(&files)?;
        info!(
            total = files.len(),
            modified = modified.len(),
            "found files for ingestion"
        );

        let current_ids: Vec<NoteId> = files
            .iter()
            .map(|f| note_id(f, folder))
            .collect();
        let current_set: HashSet<NoteId> = current_ids.iter().cloned().collect();

        let deleted: Vec<NoteId> = self
            .vector
            .note_ids()
            .into_iter()
            .filter(|id| !current_set.contains(id))
            .collect();
        if !deleted.is_empty() {
            info!(count = deleted.len(), "deleting removed notes");
            for id in &deleted {
                self.vector.delete_note(id);
            }
        }

        let mut chunks_created = 0;
        if !modified.is_empty() {
            info!(count = modified.len(), "processing modified files");
            let resolver =
                PathResolver::new(folder, self.options.attachment_folders.clone());

            for file in &modified {
                let Some((note, chunks)) = self.process_file(file, folder, &resolver).await?
                else {
                    continue;
                };
                self.vector.delete_chunks_for_note(&note.id);
                self.vector.upsert_note(note);
                chunks_created += chunks.len();
                for chunk in chunks {
                    self.vector.add_chunk(chunk);
                }
            }
        }

        info!("rebuilding relationship graph");
        let name_index = NameIndex::build(&files, folder)?;
        let mut notes: BTreeMap<NoteId, Note> = self
            .vector
            .notes_by_ids(&current_ids)
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();

        for note in notes.values_mut() {
            note.outbound_links = self
                .extractor
                .extract_wikilinks(&note.content)
                .iter()
                .filter_map(|link| name_index.resolve(link))
                .collect();
            note.embedded_refs = self
                .extractor
                .extract_embeds(&note.content)
                .iter()
                .map(|embed| sha256_hex(embed))
                .collect();
        }

        let graph = self.builder.build(&notes);
        self.builder.update_inbound_links(&mut notes, &graph.relationships);

        let report = IngestReport {
            total_files: files.len(),
            modified_files: modified.len(),
            deleted_notes: deleted.len(),
            chunks_created,
            relationships: graph.relationships.len(),
            clusters: graph.clusters.len(),
        };

        for note in notes.into_values() {
            self.vector.upsert_note(note);
        }
        self.vector.replace_relationship_graph(graph);

        info!(
            total = report.total_files,
            modified = report.modified_files,
            deleted = report.deleted_notes,
            relationships = report.relationships,
            "ingestion complete"
        );

        self.vector.save(None)?;
        self.media.save(None)?;
        Ok(report)
    }

    /// Files whose mtime is newer than the newest stored note. An empty
    /// store yields a full pass.
    fn modified_files(&self, files: &[PathBuf]) -> Result<Vec<PathBuf>, IngestError> {
        let last_modified: Option<DateTime<Utc>> = self.vector.notes().map(|n| n.modified).max();

        let mut modified = Vec::new();
        for file in files {
            let mtime: DateTime<Utc> = std::fs::metadata(file)?.modified()?.into();
            if last_modified.map_or(true, |last| mtime > last) {
                modified.push(file.clone());
            }
        }
        Ok(modified)
    }

    /// Process one markdown file: ingest its media, rewrite image references,
    /// chunk, and embed. Returns `None` (already logged) for files that
    /// cannot be read as UTF-8.
    async fn process_file(
        &mut self,
        file: &Path,
        folder: &Path,
        resolver: &PathResolver,
    ) -> Result<Option<(Note, Vec<EmbeddedChunk>)>, IngestError> {
        debug!(file = %file.display(), "processing");

        let bytes = match std::fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "unreadable file, skipping");
                return Ok(None);
            }
        };
        let raw_content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                warn!(file = %file.display(), "not valid UTF-8, skipping");
                return Ok(None);
            }
        };

        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = if raw_content.starts_with('#') {
            raw_content
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches('#')
                .trim()
                .to_string()
        } else {
            stem
        };

        let relative = file.strip_prefix(folder).unwrap_or(file);
        let id = NoteId::for_relative_path(relative);

        self.extractor
            .ingest_images(&raw_content, &id, file, self.media, resolver);
        self.extractor
            .ingest_drawings(&raw_content, &id, file, self.media, resolver);

        let content = self.extractor.rewrite_image_refs(&raw_content, &id);

        let folder_path = relative
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let metadata = std::fs::metadata(file)?;
        let modified: DateTime<Utc> = metadata.modified()?.into();
        let created: DateTime<Utc> = metadata
            .created()
            .map(DateTime::from)
            .unwrap_or(modified);

        let pieces = self.chunker.chunk_text(&content);
        let embedder = self.embedder;
        let concurrency = self.options.embed_concurrency.max(1);
        let vectors: Vec<Vec<f32>> = stream::iter(pieces.iter().map(|p| embedder.embed(&p.text)))
            .buffered(concurrency)
            .try_collect()
            .await?;

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut cursor = 0usize;
        for (i, (piece, vector)) in pieces.iter().zip(vectors).enumerate() {
            // Positions always refer to the pre-overlap slice; the overlap
            // prefix does not exist in the stored content.
            let (start_pos, end_pos) = match content[cursor..].find(&piece.source) {
                Some(offset) => {
                    let start = cursor + offset;
                    (start, start + piece.source.len())
                }
                None => match content.find(&piece.source) {
                    Some(start) => (start, start + piece.source.len()),
                    None => (cursor, cursor),
                },
            };
            cursor = end_pos;

            chunks.push(EmbeddedChunk {
                id: format!("{}_{}", id, i),
                note_id: id.clone(),
                title: title.clone(),
                text: piece.text.clone(),
                start_pos,
                end_pos,
                vector,
            });
        }

        let note = Note {
            id,
            title,
            source_path: file.to_string_lossy().into_owned(),
            content,
            created,
            modified,
            outbound_links: Vec::new(),
            inbound_links: Vec::new(),
            embedded_refs: Vec::new(),
            tags: Vec::new(),
            folder_path,
        };

        Ok(Some((note, chunks)))
    }
}

/// All `.md` files under `folder`, excluding excalidraw drawing sources,
/// in sorted enumeration order.
fn markdown_files(folder: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if entry.path().extension().map_or(false, |e| e == "md")
            && !name.ends_with(".excalidraw.md")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Note id for a file: MD5 of its path relative to the ingestion root.
fn note_id(file: &Path, folder: &Path) -> NoteId {
    NoteId::for_relative_path(file.strip_prefix(folder).unwrap_or(file))
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
