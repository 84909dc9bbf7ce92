//! Ollama embedding client
//!
//! Generates embeddings with a locally running Ollama server.
//! No API key needed; code never leaves the machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbedError, EmbedFuture, EmbeddingProvider};

/// Default Ollama server URL
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default embedding model
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Request for a single embedding
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Embedding response
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Ollama client for local embeddings
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    /// Create a client for `model` with a request timeout
    pub fn new(model: &str, timeout: Duration) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// Create client from environment or defaults
    pub fn from_env(timeout: Duration) -> Result<Self, EmbedError> {
        let url = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model = std::env::var("OLLAMA_EMBED_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());

        Ok(Self::new(&model, timeout)?.with_url(&url))
    }

    /// Environment defaults with explicit settings layered on top
    pub fn from_settings(
        model: Option<&str>,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let mut embedder = Self::from_env(timeout)?;
        if let Some(model) = model {
            embedder = embedder.with_model(model);
        }
        if let Some(endpoint) = endpoint {
            embedder = embedder.with_url(endpoint);
        }
        Ok(embedder)
    }

    /// Set the model
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Set the base URL
    pub fn with_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Status { status, body });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.embedding.is_empty() {
            return Err(EmbedError::EmptyEmbedding);
        }

        debug!("Embedded {} chars -> {} dims", text.len(), parsed.embedding.len());
        Ok(parsed.embedding)
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        Box::pin(self.request_embedding(text))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
