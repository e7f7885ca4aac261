//! Building the relationship graph from processed notes.

use std::collections::BTreeMap;

use crate::domain::{Note, NoteId, NoteRelationship, RelationshipGraph, RelationshipKind};

use super::analyzer;

/// Characters of surrounding text captured for each relationship.
const CONTEXT_CHARS: usize = 100;

/// Derives a fresh [`RelationshipGraph`] from the full note set.
#[derive(Debug, Default)]
pub struct RelationshipGraphBuilder;

impl RelationshipGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the graph: one wikilink edge per resolved note-to-note outbound
    /// link, plus folder clusters.
    ///
    /// Asset targets and links to unknown notes produce no edges. Edges are
    /// sorted by `(source, target)` so the persisted graph is stable.
    pub fn build(&self, notes: &BTreeMap<NoteId, Note>) -> RelationshipGraph {
        let mut relationships = Vec::new();

        for note in notes.values() {
            for target in &note.outbound_links {
                let Some(target_id) = target.as_note() else {
                    continue;
                };
                let Some(target_note) = notes.get(target_id) else {
                    continue;
                };

                relationships.push(NoteRelationship {
                    source_note_id: note.id.clone(),
                    target_note_id: target_id.clone(),
                    kind: RelationshipKind::Wikilink,
                    context: analyzer::relationship_context(
                        &note.content,
                        &target_note.title,
                        CONTEXT_CHARS,
                    ),
                    strength: analyzer::relationship_strength(&note.content, &target_note.title),
                });
            }
        }

        relationships.sort_by(|a, b| {
            (&a.source_note_id, &a.target_note_id).cmp(&(&b.source_note_id, &b.target_note_id))
        });

        let mut clusters: BTreeMap<String, Vec<NoteId>> = BTreeMap::new();
        for note in notes.values() {
            if !note.folder_path.is_empty() {
                clusters
                    .entry(note.folder_path.clone())
                    .or_default()
                    .push(note.id.clone());
            }
        }

        RelationshipGraph {
            relationships,
            clusters,
        }
    }

    /// Rewrite every note's `inbound_links` from the edge list: exactly the
    /// sources of edges pointing at it.
    pub fn update_inbound_links(
        &self,
        notes: &mut BTreeMap<NoteId, Note>,
        relationships: &[NoteRelationship],
    ) {
        for note in notes.values_mut() {
            note.inbound_links.clear();
        }
        for rel in relationships {
            if let Some(target) = notes.get_mut(&rel.target_note_id) {
                target.inbound_links.push(rel.source_note_id.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LinkTarget;
    use chrono::Utc;

    fn note(id: &str, title: &str, content: &str, folder: &str) -> Note {
        Note {
            id: NoteId::from(id),
            title: title.to_string(),
            source_path: format!("{}.md", title),
            content: content.to_string(),
            created: Utc::now(),
            modified: Utc::now(),
            outbound_links: Vec::new(),
            inbound_links: Vec::new(),
            embedded_refs: Vec::new(),
            tags: Vec::new(),
            folder_path: folder.to_string(),
        }
    }

    fn note_set(notes: Vec<Note>) -> BTreeMap<NoteId, Note> {
        notes.into_iter().map(|n| (n.id.clone(), n)).collect()
    }

    #[test]
    fn builds_edges_for_note_to_note_links() {
        let mut a = note("a", "Alpha", "Links to Beta twice: Beta.", "");
        a.outbound_links = vec![LinkTarget::Note(NoteId::from("b"))];
        let b = note("b", "Beta", "target", "");
        let notes = note_set(vec![a, b]);

        let graph = RelationshipGraphBuilder::new().build(&notes);
        assert_eq!(graph.relationships.len(), 1);

        let edge = &graph.relationships[0];
        assert_eq!(edge.source_note_id, NoteId::from("a"));
        assert_eq!(edge.target_note_id, NoteId::from("b"));
        assert_eq!(edge.kind, RelationshipKind::Wikilink);
        assert!((edge.strength - 0.6).abs() < 1e-6);
        assert!(edge.context.contains("Beta"));
    }

    #[test]
    fn asset_targets_produce_no_edges() {
        let mut a = note("a", "Alpha", "![[pic.png]]", "");
        a.outbound_links = vec![
            LinkTarget::Image("pic.png".to_string()),
            LinkTarget::Drawing("d.excalidraw".to_string()),
        ];
        let notes = note_set(vec![a]);

        let graph = RelationshipGraphBuilder::new().build(&notes);
        assert!(graph.relationships.is_empty());
    }

    #[test]
    fn links_to_unknown_notes_are_dropped() {
        let mut a = note("a", "Alpha", "Links to a ghost.", "");
        a.outbound_links = vec![LinkTarget::Note(NoteId::from("ghost"))];
        let notes = note_set(vec![a]);

        let graph = RelationshipGraphBuilder::new().build(&notes);
        assert!(graph.relationships.is_empty());
    }

    #[test]
    fn edges_are_sorted_by_source_then_target() {
        let mut b = note("b", "Beta", "Alpha and Gamma.", "");
        b.outbound_links = vec![
            LinkTarget::Note(NoteId::from("g")),
            LinkTarget::Note(NoteId::from("a")),
        ];
        let mut a = note("a", "Alpha", "Beta.", "");
        a.outbound_links = vec![LinkTarget::Note(NoteId::from("b"))];
        let g = note("g", "Gamma", "", "");
        let notes = note_set(vec![a, b, g]);

        let graph = RelationshipGraphBuilder::new().build(&notes);
        let pairs: Vec<(&str, &str)> = graph
            .relationships
            .iter()
            .map(|r| (r.source_note_id.as_str(), r.target_note_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "b"), ("b", "a"), ("b", "g")]);
    }

    #[test]
    fn context_is_empty_without_literal_mention() {
        let mut a = note("a", "Alpha", "No mention of the target title here.", "");
        a.outbound_links = vec![LinkTarget::Note(NoteId::from("b"))];
        let b = note("b", "Zeta", "", "");
        let notes = note_set(vec![a, b]);

        let graph = RelationshipGraphBuilder::new().build(&notes);
        assert_eq!(graph.relationships[0].context, "");
        assert_eq!(graph.relationships[0].strength, 0.0);
    }

    #[test]
    fn clusters_group_notes_by_folder() {
        let notes = note_set(vec![
            note("a", "A", "", "journal"),
            note("b", "B", "", "journal"),
            note("c", "C", "", "projects"),
            note("d", "D", "", ""),
        ]);

        let graph = RelationshipGraphBuilder::new().build(&notes);
        assert_eq!(graph.clusters.len(), 2);
        assert_eq!(
            graph.clusters["journal"],
            vec![NoteId::from("a"), NoteId::from("b")]
        );
        assert_eq!(graph.clusters["projects"], vec![NoteId::from("c")]);
        // Root-level notes never form a cluster.
        assert!(!graph.clusters.contains_key(""));
    }

    #[test]
    fn inbound_links_mirror_the_edge_list() {
        let mut a = note("a", "Alpha", "Beta Beta", "");
        a.outbound_links = vec![LinkTarget::Note(NoteId::from("b"))];
        let mut b = note("b", "Beta", "Alpha", "");
        b.outbound_links = vec![LinkTarget::Note(NoteId::from("a"))];
        // Stale inbound data must be cleared.
        b.inbound_links = vec![NoteId::from("stale")];
        let mut notes = note_set(vec![a, b]);

        let builder = RelationshipGraphBuilder::new();
        let graph = builder.build(&notes);
        builder.update_inbound_links(&mut notes, &graph.relationships);

        assert_eq!(notes[&NoteId::from("a")].inbound_links, vec![NoteId::from("b")]);
        assert_eq!(notes[&NoteId::from("b")].inbound_links, vec![NoteId::from("a")]);
    }
}
