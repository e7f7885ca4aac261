//! Name-to-target index for wiki-link resolution.
//!
//! Maps stems, file names, and root-relative paths of every markdown and
//! asset file to the thing a wiki-link naming them should resolve to.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::domain::{LinkTarget, NoteId};

use super::IngestError;

/// File extensions treated as images when building the index.
const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "tiff"];

/// Index from reference names to link targets.
///
/// Keys collide when a markdown stem equals an asset stem; the last insert
/// wins (markdown entries are inserted first, so assets shadow them). Each
/// collision is logged so vault owners can rename.
pub struct NameIndex {
    map: BTreeMap<String, LinkTarget>,
}

impl NameIndex {
    /// Build the index: stems, names, and relative paths of the given
    /// markdown files, then of every image and drawing under `folder`.
    pub fn build(markdown_files: &[PathBuf], folder: &Path) -> Result<Self, IngestError> {
        let mut index = Self {
            map: BTreeMap::new(),
        };

        for file in markdown_files {
            let relative = file.strip_prefix(folder).unwrap_or(file.as_path());
            let target = LinkTarget::Note(NoteId::for_relative_path(relative));
            index.insert_names(file, relative, target);
        }

        let mut images = Vec::new();
        let mut drawings = Vec::new();
        for entry in WalkDir::new(folder).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(ext) = entry.path().extension().map(|e| e.to_string_lossy().into_owned())
            else {
                continue;
            };
            if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                images.push(entry.into_path());
            } else if ext == "excalidraw" {
                drawings.push(entry.into_path());
            }
        }

        for file in images {
            let relative = file.strip_prefix(folder).unwrap_or(file.as_path()).to_path_buf();
            let target = LinkTarget::Image(relative.to_string_lossy().into_owned());
            index.insert_names(&file, &relative, target);
        }
        for file in drawings {
            let relative = file.strip_prefix(folder).unwrap_or(file.as_path()).to_path_buf();
            let target = LinkTarget::Drawing(relative.to_string_lossy().into_owned());
            index.insert_names(&file, &relative, target);
        }

        Ok(index)
    }

    /// Resolve a wiki-link target to a note id or asset reference.
    ///
    /// Tries, in order: exact key, key plus `.md`, path-stem match (note
    /// entries preferred), then a lenient case-insensitive match against
    /// asset entries. Unresolvable links are logged and dropped.
    pub fn resolve(&self, link: &str) -> Option<LinkTarget> {
        if let Some(target) = self.map.get(link) {
            return Some(target.clone());
        }

        if let Some(target) = self.map.get(&format!("{}.md", link)) {
            return Some(target.clone());
        }

        let stem_matches: Vec<&LinkTarget> = self
            .map
            .iter()
            .filter(|(key, _)| {
                Path::new(key)
                    .file_stem()
                    .map(|s| s.to_string_lossy() == link)
                    .unwrap_or(false)
            })
            .map(|(_, target)| target)
            .collect();
        if let Some(target) = stem_matches
            .iter()
            .find(|t| !t.is_asset())
            .or_else(|| stem_matches.first())
        {
            return Some((*target).clone());
        }

        let link_lower = link.to_lowercase();
        for (key, target) in &self.map {
            if !target.is_asset() {
                continue;
            }
            let stem_lower = Path::new(key)
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if key.to_lowercase() == link_lower || stem_lower == link_lower {
                return Some(target.clone());
            }
        }

        warn!(link, "could not resolve wikilink");
        None
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Map stem, file name, and relative path to `target`.
    fn insert_names(&mut self, file: &Path, relative: &Path, target: LinkTarget) {
        if let Some(stem) = file.file_stem() {
            self.insert(stem.to_string_lossy().into_owned(), target.clone());
        }
        if let Some(name) = file.file_name() {
            self.insert(name.to_string_lossy().into_owned(), target.clone());
        }
        self.insert(relative.to_string_lossy().into_owned(), target);
    }

    fn insert(&mut self, key: String, target: LinkTarget) {
        if let Some(previous) = self.map.get(&key) {
            if previous != &target {
                warn!(key = %key, previous = %previous, new = %target, "name collision in reference index");
            }
        }
        self.map.insert(key, target);
    }
}
