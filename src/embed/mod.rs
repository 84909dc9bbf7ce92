//! Embedding generation
//!
//! Vectors come from an external provider; this module only builds the input
//! text and defines the provider seam.

pub mod input;
pub mod ollama;
#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use input::{build_embedding_input, DEFAULT_MAX_CHARS};
pub use ollama::OllamaEmbedder;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Embedding provider returned an empty vector")]
    EmptyEmbedding,
}

pub type EmbedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbedError>> + Send + 'a>>;

/// Source of fixed-dimension embedding vectors.
///
/// Every chunk of one index must be embedded by the same provider and model.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one input text
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a>;

    /// Model identifier recorded in the index manifest
    fn model(&self) -> &str;
}
