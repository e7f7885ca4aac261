//! Text embedding capability.
//!
//! The engine never instantiates an embedding client itself; it consumes the
//! [`Embedder`] trait, injected at construction. Production adapters call the
//! Voyage AI or OpenAI embeddings APIs; tests use deterministic doubles.

mod openai;
mod voyage;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiEmbedder;
pub use voyage::VoyageEmbedder;

/// Errors from embedding backends.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding response malformed: {0}")]
    MalformedResponse(String),
}

/// Capability: turn text into a fixed-dimension float vector.
///
/// Dimensionality must be uniform within a store; mixing models across one
/// store is undefined behavior.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}
