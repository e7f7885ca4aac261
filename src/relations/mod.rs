//! Derivation of the inter-note relationship graph.
//!
//! Edges come from resolved wiki-links; clusters from folder co-membership.
//! The graph is cleared and rebuilt on every ingestion pass, never patched.

mod analyzer;
mod builder;

pub use analyzer::{relationship_context, relationship_strength};
pub use builder::RelationshipGraphBuilder;
