//! Extraction of image references, wiki-links, and embeds from Markdown,
//! and rewriting of image references to canonical API URLs.
//!
//! All extraction is pure over the content string and preserves document
//! order. The extractor also drives media ingestion: each extracted image or
//! drawing reference is resolved on disk and stored content-addressed.

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use std::path::Path;
use tracing::{info, warn};

use crate::domain::{Image, NoteId};
use crate::store::MediaStore;

use super::resolver::PathResolver;

/// Extensions recognized as images in `![[...]]` wikilink form.
const IMAGE_EXT_ALTERNATION: &str = "png|jpg|jpeg|gif|svg|webp|bmp|tiff";

/// Extracts and rewrites content references in Markdown.
pub struct ContentExtractor {
    image_pattern: Regex,
    rewrite_pattern: Regex,
    embed_pattern: Regex,
    drawing_pattern: Regex,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor {
    pub fn new() -> Self {
        // ![alt](path) with balanced parentheses inside path, <img src="...">,
        // and ![[image.ext]].
        let image_pattern = Regex::new(&format!(
            r#"!\[[^\]]*\]\((?P<md>[^()]*(?:\([^()]*\)[^()]*)*)\)|<img[^>]+src=['"](?P<html>.*?)['"][^>]*>|!\[\[(?P<wiki>[^\]]+\.(?:{exts}))\]\]"#,
            exts = IMAGE_EXT_ALTERNATION
        ))
        .expect("static regex");
        let rewrite_pattern = Regex::new(&format!(
            r#"!\[(?P<alt>[^\]]*)\]\((?P<md>[^()]*(?:\([^()]*\)[^()]*)*)\)|<img[^>]+src=['"](?P<html>.*?)['"][^>]*>|!\[\[(?P<exc>[^\]]+\.excalidraw)\]\]|!\[\[(?P<wiki>[^\]]+\.(?:{exts}))\]\]"#,
            exts = IMAGE_EXT_ALTERNATION
        ))
        .expect("static regex");
        let embed_pattern = Regex::new(r"!\[\[([^\]]+)\]\]").expect("static regex");
        let drawing_pattern = Regex::new(r"!\[\[([^\]]+\.excalidraw)\]\]").expect("static regex");

        Self {
            image_pattern,
            rewrite_pattern,
            embed_pattern,
            drawing_pattern,
        }
    }

    /// Image paths referenced by the content, in document order.
    ///
    /// External URLs are not local media and are filtered out.
    pub fn extract_image_paths(&self, content: &str) -> Vec<String> {
        let mut paths = Vec::new();
        for caps in self.image_pattern.captures_iter(content) {
            let path = caps
                .name("md")
                .or_else(|| caps.name("html"))
                .or_else(|| caps.name("wiki"))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            if path.is_empty() || is_external_url(path) {
                continue;
            }
            paths.push(path.to_string());
        }
        paths
    }

    /// Wiki-link targets (`[[target]]` or `[[target|display]]`), unchanged.
    ///
    /// Embeds (`![[...]]`) contain a wiki-link and are extracted too; asset
    /// targets are filtered later, during reference resolution.
    pub fn extract_wikilinks(&self, content: &str) -> Vec<String> {
        let mut links = Vec::new();
        let mut chars = content.chars().peekable();
        let mut in_link = false;
        let mut link_text = String::new();

        while let Some(c) = chars.next() {
            if c == '[' && chars.peek() == Some(&'[') {
                chars.next();
                in_link = true;
                link_text.clear();
            } else if in_link && c == ']' {
                if chars.peek() == Some(&']') {
                    chars.next();
                    in_link = false;

                    let target = match link_text.find('|') {
                        Some(pipe) => &link_text[..pipe],
                        None => link_text.as_str(),
                    };
                    if !target.is_empty() {
                        links.push(target.to_string());
                    }
                } else {
                    // A lone `]` cannot appear inside a wikilink; the
                    // candidate is malformed, not a link.
                    in_link = false;
                    link_text.clear();
                }
            } else if in_link {
                link_text.push(c);
            }
        }

        links
    }

    /// Embedded content references: `![[anything]]`.
    pub fn extract_embeds(&self, content: &str) -> Vec<String> {
        self.embed_pattern
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Drawing references: `![[path.excalidraw]]`.
    pub fn extract_drawing_refs(&self, content: &str) -> Vec<String> {
        self.drawing_pattern
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Rewrite every image reference to its canonical API URL,
    /// `![alt](/api/images/{note_id}/{decoded-path})`.
    ///
    /// Trailing `.excalidraw` becomes `.excalidraw.png` (the rendered
    /// sibling). External URLs are left untouched. Alt text is preserved for
    /// `![alt](path)`; the other syntaxes have none.
    pub fn rewrite_image_refs(&self, content: &str, note_id: &NoteId) -> String {
        self.rewrite_pattern
            .replace_all(content, |caps: &Captures<'_>| {
                let alt = caps.name("alt").map(|m| m.as_str()).unwrap_or("");
                let raw = caps
                    .name("md")
                    .or_else(|| caps.name("html"))
                    .or_else(|| caps.name("exc"))
                    .or_else(|| caps.name("wiki"))
                    .map(|m| m.as_str().trim())
                    .unwrap_or("");

                if is_external_url(raw) {
                    return caps[0].to_string();
                }

                let mut path = percent_decode_str(raw).decode_utf8_lossy().into_owned();
                if path.ends_with(".excalidraw") {
                    path.push_str(".png");
                }
                format!("![{}](/api/images/{}/{})", alt, note_id, path)
            })
            .into_owned()
    }

    /// Resolve and store every image the content references.
    ///
    /// Unresolved references are logged and skipped; they never fail a pass.
    pub fn ingest_images(
        &self,
        content: &str,
        note_id: &NoteId,
        note_file: &Path,
        media: &mut MediaStore,
        resolver: &PathResolver,
    ) {
        for reference in self.extract_image_paths(content) {
            let Some(resolved) = resolver.resolve(note_file, &reference) else {
                warn!(reference = %reference, "image not found");
                continue;
            };
            let decoded = percent_decode_str(&reference)
                .decode_utf8_lossy()
                .into_owned();
            store_image(&resolved, &decoded, note_id, media);
        }
    }

    /// Resolve and store the rendered PNG sibling of each drawing reference.
    pub fn ingest_drawings(
        &self,
        content: &str,
        note_id: &NoteId,
        note_file: &Path,
        media: &mut MediaStore,
        resolver: &PathResolver,
    ) {
        for reference in self.extract_drawing_refs(content) {
            let png_ref = format!(
                "{}.png",
                percent_decode_str(&reference).decode_utf8_lossy()
            );
            let Some(resolved) = resolver.resolve(note_file, &png_ref) else {
                warn!(reference = %png_ref, "drawing PNG not found");
                continue;
            };
            store_image(&resolved, &png_ref, note_id, media);
        }
    }
}

/// Read, hash, and store one resolved image file.
fn store_image(path: &Path, reference: &str, note_id: &NoteId, media: &mut MediaStore) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read image");
            return;
        }
    };

    let mime_type = match mime_guess::from_path(path).first() {
        Some(mime) if mime.type_() == mime_guess::mime::IMAGE => mime.essence_str().to_string(),
        _ => {
            warn!(path = %path.display(), "not an image or unknown type");
            return;
        }
    };

    let id = Image::id_for_bytes(&bytes);
    info!(reference, id = %id, "stored image");
    media.add(Image {
        id,
        note_id: note_id.clone(),
        content: bytes,
        mime_type,
        relative_path: reference.to_string(),
        absolute_path: path.to_string_lossy().into_owned(),
    });
}

fn is_external_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}
