//! Index command - embed every chunk of a project

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;

use nexus_dupes::config::Config;
use nexus_dupes::embed::{EmbeddingProvider, OllamaEmbedder};
use nexus_dupes::index;

pub async fn run(config: Config, path: Option<&str>) -> Result<()> {
    let path = Path::new(path.unwrap_or("."));
    let provider = create_provider(&config)?;

    // Skipped files and failed embeddings are reported in the summary, not as errors
    let _result = index::index_project(path, &config, provider, true).await?;

    Ok(())
}

fn create_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedding.provider.as_str() {
        "ollama" => {
            // OLLAMA_HOST / OLLAMA_EMBED_MODEL apply unless the config pins them
            let embedder = OllamaEmbedder::from_settings(
                config.embedding.model.as_deref(),
                config.embedding.endpoint.as_deref(),
                config.embed_timeout(),
            )?;
            Ok(Arc::new(embedder))
        }
        other => bail!("Unsupported embedding provider: {}", other),
    }
}
