//! Shared fixtures for integration tests: a temp-dir vault builder and a
//! deterministic mock embedder.

#![allow(dead_code)]

use async_trait::async_trait;
use filetime::FileTime;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use rhizome::{
    EmbedError, Embedder, IngestOptions, IngestReport, IngestionOrchestrator, MediaStore, NoteId,
    VectorStore,
};

/// Deterministic embedder: a 5-dimension vector derived from the MD5 of the
/// text. Counts calls so tests can assert what got re-embedded.
pub struct MockEmbedder {
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let digest = md5::compute(text.as_bytes());
        Ok(digest.0[..5].iter().map(|b| f32::from(*b) / 255.0).collect())
    }
}

/// A notes vault on disk plus a separate directory for store documents.
pub struct TestVault {
    dir: TempDir,
}

impl TestVault {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::create_dir_all(dir.path().join("state")).unwrap();
        Self { dir }
    }

    /// Root of the notes tree handed to the orchestrator.
    pub fn notes_dir(&self) -> PathBuf {
        self.dir.path().join("notes")
    }

    /// Where the store documents live.
    pub fn vector_db_path(&self) -> PathBuf {
        self.dir.path().join("state").join("vector.json")
    }

    pub fn image_store_path(&self) -> PathBuf {
        self.dir.path().join("state").join("images.json")
    }

    /// Write a file under the notes tree, creating parent directories.
    pub fn write(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.notes_dir().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn write_note(&self, relative: &str, content: &str) -> PathBuf {
        self.write(relative, content.as_bytes())
    }

    pub fn delete(&self, relative: &str) {
        std::fs::remove_file(self.notes_dir().join(relative)).unwrap();
    }

    /// Push a file's mtime into the past so later writes read as newer.
    pub fn age_file(&self, relative: &str, seconds: u64) {
        let path = self.notes_dir().join(relative);
        let mtime = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(seconds));
        filetime::set_file_mtime(&path, mtime).unwrap();
    }

    /// Age every markdown file currently in the vault.
    pub fn age_all(&self, seconds: u64) {
        for entry in walkdir_files(&self.notes_dir()) {
            let mtime =
                FileTime::from_system_time(SystemTime::now() - Duration::from_secs(seconds));
            filetime::set_file_mtime(&entry, mtime).unwrap();
        }
    }

    /// The id the orchestrator derives for a note at this relative path.
    pub fn note_id(&self, relative: &str) -> NoteId {
        NoteId::for_relative_path(Path::new(relative))
    }
}

fn walkdir_files(root: &Path) -> Vec<PathBuf> {
    fn visit(dir: &Path, out: &mut Vec<PathBuf>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                visit(&path, out);
            } else {
                out.push(path);
            }
        }
    }
    let mut out = Vec::new();
    visit(root, &mut out);
    out
}

/// Run one full ingestion pass, reloading both stores from disk first —
/// the same shape a restarted process sees.
pub async fn run_pass(
    vault: &TestVault,
    embedder: &dyn Embedder,
    options: IngestOptions,
) -> (VectorStore, MediaStore, IngestReport) {
    let mut vector = VectorStore::open(vault.vector_db_path()).unwrap();
    let mut media = MediaStore::open(vault.image_store_path()).unwrap();

    let report = IngestionOrchestrator::new(embedder, &mut vector, &mut media, options)
        .unwrap()
        .ingest(&vault.notes_dir())
        .await
        .unwrap();

    (vector, media, report)
}

/// `run_pass` with default options.
pub async fn run_default_pass(
    vault: &TestVault,
    embedder: &dyn Embedder,
) -> (VectorStore, MediaStore, IngestReport) {
    run_pass(vault, embedder, IngestOptions::default()).await
}
