//! Path resolution for images and attachments.

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolves reference strings from note content to absolute paths on disk.
///
/// Candidates are tried most-specific first: next to the note, in the note's
/// `<stem>.assets` folder, in each configured attachment folder (directly and
/// under `<stem>.assets`), and finally relative to the ingestion root.
pub struct PathResolver {
    base_path: PathBuf,
    attachment_folders: Vec<String>,
}

impl PathResolver {
    pub fn new(base_path: impl Into<PathBuf>, attachment_folders: Vec<String>) -> Self {
        Self {
            base_path: base_path.into(),
            attachment_folders,
        }
    }

    /// Resolve `reference` as it appears in `note_file`'s content.
    ///
    /// References are percent-decoded first; notes frequently carry
    /// URL-encoded spaces. Returns the first candidate that exists on disk,
    /// or `None` (logged at warn, callers skip the reference).
    pub fn resolve(&self, note_file: &Path, reference: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(reference).decode_utf8_lossy().into_owned();
        debug!(reference, decoded = %decoded, "resolving reference");

        for candidate in self.candidates(note_file, &decoded) {
            debug!(candidate = %candidate.display(), "trying candidate");
            if candidate.exists() {
                info!(reference, resolved = %candidate.display(), "resolved reference");
                return Some(candidate);
            }
        }

        warn!(reference, "failed to resolve reference");
        None
    }

    /// Every path `resolve` would try, in order. Useful for diagnostics.
    pub fn resolution_candidates(&self, note_file: &Path, reference: &str) -> Vec<PathBuf> {
        let decoded = percent_decode_str(reference).decode_utf8_lossy().into_owned();
        self.candidates(note_file, &decoded)
    }

    fn candidates(&self, note_file: &Path, decoded: &str) -> Vec<PathBuf> {
        let parent = note_file.parent().unwrap_or_else(|| Path::new(""));
        let stem = note_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let basename = Path::new(decoded)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| decoded.to_string());

        let mut candidates = vec![
            parent.join(decoded),
            parent.join(format!("{}.assets", stem)).join(&basename),
        ];
        for folder in &self.attachment_folders {
            candidates.push(self.base_path.join(folder).join(decoded));
            candidates.push(
                self.base_path
                    .join(folder)
                    .join(format!("{}.assets", stem))
                    .join(&basename),
            );
        }
        candidates.push(self.base_path.join(decoded));
        candidates
    }
}
