//! Persistent stores for notes, chunks, and media.
//!
//! Both stores are in-memory maps persisted as single JSON documents. Writes
//! go to a sibling temp file followed by a rename, so a crash mid-save never
//! corrupts the previous snapshot.

mod media;
mod vector;

use std::io::Write as _;
use std::path::Path;

use thiserror::Error;

pub use media::MediaStore;
pub use vector::VectorStore;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("note not found: {0}")]
    NoteNotFound(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("no persistence path configured for this store")]
    NoPathConfigured,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Write `bytes` to `path` atomically: temp file in the same directory, then
/// rename over the target.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    let mut file = std::fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
