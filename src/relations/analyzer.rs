//! Relationship strength and context analysis.

use regex::{Regex, RegexBuilder};

/// Case-insensitive matcher for a literal title.
fn title_matcher(title: &str) -> Option<Regex> {
    if title.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(title))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Strength of a link from a note to a target, based on how often the target's
/// title is mentioned: `min(0.3 * occurrences + 0.2 * header_occurrences, 1.0)`.
///
/// `header_occurrences` counts mentions on lines beginning with one to six
/// `#` characters.
pub fn relationship_strength(source_content: &str, target_title: &str) -> f32 {
    let Some(matcher) = title_matcher(target_title) else {
        return 0.0;
    };

    let occurrences = matcher.find_iter(source_content).count();

    let header_occurrences: usize = source_content
        .lines()
        .filter(|line| {
            let hashes = line.chars().take_while(|c| *c == '#').count();
            (1..=6).contains(&hashes)
        })
        .map(|line| matcher.find_iter(line).count())
        .sum();

    (0.3 * occurrences as f32 + 0.2 * header_occurrences as f32).min(1.0)
}

/// Context around the first case-insensitive mention of `target_title`:
/// up to `context_chars` characters on each side, whitespace collapsed.
/// Empty when the title never literally occurs.
pub fn relationship_context(content: &str, target_title: &str, context_chars: usize) -> String {
    let Some(matcher) = title_matcher(target_title) else {
        return String::new();
    };
    let Some(m) = matcher.find(content) else {
        return String::new();
    };

    let before = &content[..m.start()];
    let skip = before.chars().count().saturating_sub(context_chars);
    let start = before
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(before.len());

    let after = &content[m.end()..];
    let end = m.end()
        + after
            .char_indices()
            .nth(context_chars)
            .map(|(i, _)| i)
            .unwrap_or(after.len());

    let window = content[start..end].trim();
    let collapse = Regex::new(r"\s+").expect("static regex");
    collapse.replace_all(window, " ").into_owned()
}
