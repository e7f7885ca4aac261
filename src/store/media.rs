//! Content-addressed store for ingested images.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::Image;

use super::{write_atomic, StoreError, StoreResult};

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MediaDocument {
    images: BTreeMap<String, Image>,
}

/// In-memory image store persisted as a single JSON document.
///
/// Images are keyed by the SHA-256 of their bytes; duplicate bytes across
/// notes collapse to one entry. A secondary `(note_id, relative_path)` index
/// supports the lookup the image-serving endpoint performs; it is rebuilt on
/// load and never persisted.
pub struct MediaStore {
    images: BTreeMap<String, Image>,
    by_path: HashMap<(String, String), String>,
    path: Option<PathBuf>,
}

impl Default for MediaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaStore {
    /// Create an empty store with no persistence path.
    pub fn new() -> Self {
        Self {
            images: BTreeMap::new(),
            by_path: HashMap::new(),
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
        let document: MediaDocument = serde_json::from_slice(&bytes)?;

        let mut store = Self::new();
        for (_, image) in document.images {
            store.index(&image);
            store.images.insert(image.id.clone(), image);
        }
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Upsert an image by content hash.
    pub fn add(&mut self, image: Image) {
        self.index(&image);
        self.images.insert(image.id.clone(), image);
    }

    /// Get an image by id.
    pub fn get(&self, image_id: &str) -> StoreResult<&Image> {
        self.images
            .get(image_id)
            .ok_or_else(|| StoreError::ImageNotFound(image_id.to_string()))
    }

    /// Find the image id referenced by `(note_id, relative_path)`.
    pub fn lookup(&self, note_id: &str, relative_path: &str) -> Option<&str> {
        self.by_path
            .get(&(note_id.to_string(), relative_path.to_string()))
            .map(String::as_str)
    }

    /// All image ids.
    pub fn ids(&self) -> Vec<String> {
        self.images.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Persist to `path`, or to the configured path when `None`.
    pub fn save(&self, path: Option<&Path>) -> StoreResult<()> {
        let target = path
            .or(self.path.as_deref())
            .ok_or(StoreError::NoPathConfigured)?;

        let document = MediaDocument {
            images: self.images.clone(),
        };
        let bytes = serde_json::to_vec(&document)?;
        write_atomic(target, &bytes)?;
        debug!(path = %target.display(), images = self.images.len(), "media store saved");
        Ok(())
    }

    fn index(&mut self, image: &Image) {
        self.by_path.insert(
            (
                image.note_id.as_str().to_string(),
                image.relative_path.clone(),
            ),
            image.id.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NoteId;
    use tempfile::TempDir;

    fn image(bytes: &[u8], note_id: &str, relative_path: &str) -> Image {
        Image {
            id: Image::id_for_bytes(bytes),
            note_id: NoteId::from(note_id),
            content: bytes.to_vec(),
            mime_type: "image/png".to_string(),
            relative_path: relative_path.to_string(),
            absolute_path: format!("/vault/{}", relative_path),
        }
    }

    #[test]
    fn add_and_get_round_trip() {
        let mut store = MediaStore::new();
        let img = image(b"bytes", "n1", "a.png");
        let id = img.id.clone();
        store.add(img.clone());

        assert_eq!(store.get(&id).unwrap(), &img);
    }

    #[test]
    fn get_missing_image_fails() {
        let store = MediaStore::new();
        assert!(matches!(
            store.get("nope"),
            Err(StoreError::ImageNotFound(_))
        ));
    }

    #[test]
    fn duplicate_bytes_share_one_entry_with_two_index_rows() {
        let mut store = MediaStore::new();
        store.add(image(b"same", "n1", "one.png"));
        store.add(image(b"same", "n2", "two.png"));

        assert_eq!(store.len(), 1);
        let id = Image::id_for_bytes(b"same");
        assert_eq!(store.lookup("n1", "one.png"), Some(id.as_str()));
        assert_eq!(store.lookup("n2", "two.png"), Some(id.as_str()));
    }

    #[test]
    fn lookup_misses_return_none() {
        let mut store = MediaStore::new();
        store.add(image(b"x", "n1", "a.png"));
        assert_eq!(store.lookup("n1", "other.png"), None);
        assert_eq!(store.lookup("n2", "a.png"), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("images.json");

        let mut store = MediaStore::open(&path).unwrap();
        store.add(image(b"payload", "n1", "pics/a.png"));
        store.save(None).unwrap();

        let loaded = MediaStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let id = Image::id_for_bytes(b"payload");
        assert_eq!(loaded.get(&id).unwrap().content, b"payload");
        assert_eq!(loaded.lookup("n1", "pics/a.png"), Some(id.as_str()));
    }

    #[test]
    fn save_without_path_is_an_error() {
        let store = MediaStore::new();
        assert!(matches!(
            store.save(None),
            Err(StoreError::NoPathConfigured)
        ));
    }

    #[test]
    fn open_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }
}
