//! Structure-aware text chunking with BPE token budgets.
//!
//! Splits Markdown top-down: header sections first, oversized sections on
//! paragraph boundaries (keeping lists intact), oversized paragraphs on
//! sentence boundaries. Adjacent pieces are packed greedily into chunks of
//! at most `max_tokens` BPE tokens, then optional overlap context from the
//! preceding chunk is prepended.

use regex::Regex;
use tiktoken_rs::{cl100k_base, CoreBPE};

use super::IngestError;

/// One chunk produced by [`TextChunker::chunk_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkText {
    /// Text to embed, including any prepended `Previous context:` prefix.
    pub text: String,
    /// The original slice before overlap was added. Position lookups in the
    /// note content must use this, never `text`.
    pub source: String,
}

/// Splits Markdown text into token-bounded chunks.
pub struct TextChunker {
    max_tokens: usize,
    overlap: usize,
    bpe: CoreBPE,
    header_line: Regex,
    list_start: Regex,
}

impl TextChunker {
    /// Create a chunker with the given token budget and overlap.
    ///
    /// Token counts use the `cl100k_base` encoding (the gpt-3.5-turbo BPE).
    pub fn new(max_tokens: usize, overlap: usize) -> Result<Self, IngestError> {
        let bpe = cl100k_base().map_err(|e| IngestError::Tokenizer(e.to_string()))?;
        Ok(Self {
            max_tokens,
            overlap,
            bpe,
            header_line: Regex::new(r"(?m)^#{1,6}\s+.+$").expect("static regex"),
            list_start: Regex::new(r"^(?:\s*[-*+]|\d+\.)").expect("static regex"),
        })
    }

    /// Number of BPE tokens in `text`.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Split `text` into chunks of at most `max_tokens` tokens.
    ///
    /// Empty or whitespace-only input yields no chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<ChunkText> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        for section in self.split_on_headers(text) {
            let section_tokens = self.count_tokens(section);
            if section_tokens > self.max_tokens {
                for paragraph in self.split_on_paragraphs(section) {
                    let para_tokens = self.count_tokens(&paragraph);
                    if para_tokens > self.max_tokens {
                        for sentence in split_on_sentences(&paragraph) {
                            self.accumulate(sentence, &mut current, &mut current_tokens, &mut chunks);
                        }
                    } else {
                        self.accumulate(&paragraph, &mut current, &mut current_tokens, &mut chunks);
                    }
                }
            } else {
                self.accumulate(section, &mut current, &mut current_tokens, &mut chunks);
            }
        }

        if !current.is_empty() {
            chunks.push(current.trim().to_string());
        }

        self.add_overlap(chunks)
    }

    /// Try to append `piece` to the accumulating chunk; flush first when the
    /// budget would overflow.
    fn accumulate(
        &self,
        piece: &str,
        current: &mut String,
        current_tokens: &mut usize,
        chunks: &mut Vec<String>,
    ) {
        let piece = piece.trim();
        if piece.is_empty() {
            return;
        }

        let piece_tokens = self.count_tokens(piece);
        if *current_tokens + piece_tokens > self.max_tokens {
            if !current.is_empty() {
                chunks.push(current.trim().to_string());
            }
            *current = piece.to_string();
            *current_tokens = piece_tokens;
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(piece);
            *current_tokens += piece_tokens;
        }
    }

    /// Split on header lines without consuming them: each section starts at a
    /// `#{1,6} ` heading (or the start of the document).
    fn split_on_headers<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut boundaries: Vec<usize> = self
            .header_line
            .find_iter(text)
            .map(|m| m.start())
            .collect();
        if boundaries.first() != Some(&0) {
            boundaries.insert(0, 0);
        }
        boundaries.push(text.len());

        boundaries
            .windows(2)
            .map(|w| text[w[0]..w[1]].trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Split into paragraphs on blank lines, except where the following line
    /// starts a list item, so list structure stays in one piece.
    fn split_on_paragraphs(&self, text: &str) -> Vec<String> {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut parts: Vec<String> = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let is_empty = line.trim().is_empty();
            let next_is_list = i + 1 < lines.len() && self.list_start.is_match(lines[i + 1]);

            current.push(line);

            if is_empty && i + 1 < lines.len() && !next_is_list {
                parts.push(current.join("\n"));
                current.clear();
            }
        }
        if !current.is_empty() {
            parts.push(current.join("\n"));
        }

        parts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Prepend overlap context from the previous chunk to each chunk after
    /// the first. The returned `source` is always the pre-overlap text.
    fn add_overlap(&self, chunks: Vec<String>) -> Vec<ChunkText> {
        if self.overlap == 0 || chunks.len() <= 1 {
            return chunks
                .into_iter()
                .map(|c| ChunkText {
                    text: c.clone(),
                    source: c,
                })
                .collect();
        }

        let mut out = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let text = if i == 0 {
                chunk.clone()
            } else {
                let prev_tokens = self.bpe.encode_ordinary(&chunks[i - 1]);
                let tail_start = prev_tokens.len().saturating_sub(self.overlap);
                match self.bpe.decode(prev_tokens[tail_start..].to_vec()) {
                    Ok(context) => format!("Previous context: {}\n\n{}", context, chunk),
                    // A tail that does not decode to valid UTF-8 just loses
                    // its overlap; the chunk itself is unaffected.
                    Err(_) => chunk.clone(),
                }
            };
            out.push(ChunkText {
                text,
                source: chunk.clone(),
            });
        }
        out
    }
}

/// Split on sentence boundaries: whitespace following `.`, `!`, or `?`.
fn split_on_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() {
                sentences.push(&text[start..i + 1]);
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_tokens: usize, overlap: usize) -> TextChunker {
        TextChunker::new(max_tokens, overlap).unwrap()
    }

    #[test]
    fn small_text_is_a_single_chunk() {
        let c = chunker(1000, 100);
        let text = "This is a small text that should fit in one chunk.";
        let chunks = c.chunk_text(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].source, text);
    }

    #[test]
    fn empty_and_whitespace_input_yield_nothing() {
        let c = chunker(1000, 100);
        assert!(c.chunk_text("").is_empty());
        assert!(c.chunk_text("   \n\n   ").is_empty());
    }

    #[test]
    fn splits_long_text_into_multiple_chunks() {
        let c = chunker(20, 5);
        let text = "# Header 1\n\nThis is a paragraph under header 1 with lots of content that should definitely exceed the token limit.\n\n## Header 2\n\nThis is another paragraph under header 2 with even more content to ensure we get multiple chunks.\n\n### Header 3\n\nAnd this is a third paragraph with additional content to make sure we have enough text to split.";
        let chunks = c.chunk_text(text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|ch| !ch.source.trim().is_empty()));
    }

    #[test]
    fn header_boundaries_are_respected() {
        let c = chunker(10, 2);
        let text = "# First Header\n\nThis is a long paragraph under the first header with lots of content that should definitely exceed our very small token limit and cause multiple chunks to be created.\n\n# Second Header\n\nThis is another long paragraph under the second header with even more content to ensure we get proper splitting behavior.";
        let chunks = c.chunk_text(text);

        assert!(chunks.len() >= 2);
        assert!(chunks.iter().any(|ch| ch.source.contains("# First Header")));
        assert!(chunks.iter().any(|ch| ch.source.contains("# Second Header")));
        assert!(chunks.iter().any(|ch| ch.source.starts_with('#')));
    }

    #[test]
    fn smaller_budget_means_more_chunks() {
        let small = chunker(10, 2);
        let large = chunker(100, 2);
        let text = "This is a long text that contains multiple sentences and paragraphs.\n\nIt should definitely exceed a 10-token limit but stay within a 100-token limit.\nThe small chunker should create multiple chunks while the large chunker creates fewer.";
        assert!(small.chunk_text(text).len() > large.chunk_text(text).len());
    }

    #[test]
    fn overlap_prefixes_every_chunk_after_the_first() {
        let c = chunker(15, 5);
        let text = "This is the first section with some content that will span multiple chunks.\n\nThis is the second section with more content that will also span multiple chunks.\n\nThis is the third section with even more content to ensure proper chunking behavior.";
        let chunks = c.chunk_text(text);

        assert!(chunks.len() > 1);
        assert!(!chunks[0].text.contains("Previous context:"));
        for ch in &chunks[1..] {
            assert!(ch.text.starts_with("Previous context: "));
            assert!(!ch.source.contains("Previous context:"));
            assert!(ch.text.ends_with(&ch.source));
        }
    }

    #[test]
    fn zero_overlap_never_adds_context() {
        let c = chunker(15, 0);
        let text = "This is the first section with some content that will span multiple chunks.\n\nThis is the second section with more content that will also span multiple chunks.";
        let chunks = c.chunk_text(text);
        assert!(chunks.iter().all(|ch| !ch.text.contains("Previous context:")));
        assert!(chunks.iter().all(|ch| ch.text == ch.source));
    }

    #[test]
    fn overlap_larger_than_budget_still_prefixes() {
        let c = chunker(10, 50);
        let text = "First sentence of substantial length to fill the budget completely.\n\nSecond sentence of substantial length to force another chunk entirely.";
        let chunks = c.chunk_text(text);
        assert!(chunks.len() > 1);
        for ch in &chunks[1..] {
            assert!(ch.text.starts_with("Previous context: "));
        }
    }

    #[test]
    fn lists_stay_with_their_paragraph() {
        let c = chunker(1000, 0);
        let text = "Intro line before the list.\n\n- first item\n- second item\n- third item";
        // Blank line is followed by a list item, so no paragraph split occurs.
        let parts = c.split_on_paragraphs(text);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].contains("- third item"));
    }

    #[test]
    fn sentences_split_after_terminal_punctuation() {
        let sentences = split_on_sentences("One sentence. Another one! A third? Trailing");
        assert_eq!(
            sentences,
            vec!["One sentence.", "Another one!", "A third?", "Trailing"]
        );
    }
}
