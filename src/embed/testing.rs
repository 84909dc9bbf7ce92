//! Deterministic in-process embedder for tests

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{EmbedError, EmbedFuture, EmbeddingProvider};

const DIMENSION: usize = 64;

/// Bag-of-tokens embedder: identical text gives identical vectors
#[derive(Default)]
pub(crate) struct TokenEmbedder {
    /// Inputs containing this marker fail
    pub fail_on: Option<String>,
    pub calls: AtomicUsize,
}

impl TokenEmbedder {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::default()
        }
    }
}

pub(crate) fn token_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSION];
    for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
        let mut hash: u64 = 0xcbf29ce484222325;
        for b in token.bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % DIMENSION as u64) as usize] += 1.0;
    }
    vector
}

impl EmbeddingProvider for TokenEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failed = self.fail_on.as_deref().is_some_and(|m| text.contains(m));
        Box::pin(async move {
            if failed {
                Err(EmbedError::Status {
                    status: 500,
                    body: "model crashed".to_string(),
                })
            } else {
                Ok(token_vector(text))
            }
        })
    }

    fn model(&self) -> &str {
        "token-bag"
    }
}
