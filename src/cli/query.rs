//! Query command - rank the chunks most similar to one chunk

use anyhow::{Context, Result};
use std::path::Path;

use nexus_dupes::config::Config;
use nexus_dupes::core::cache::IndexCache;
use nexus_dupes::search::{query_with_limit, BruteForceSearch};

use super::colors;

pub fn run(config: Config, chunk_id: &str, root: &str, threshold: Option<f32>, limit: usize) -> Result<()> {
    let root = Path::new(root).canonicalize()
        .with_context(|| format!("Invalid project root: {}", root))?;
    let threshold = threshold.unwrap_or(config.lint.threshold as f32);

    let cache = IndexCache::new(&config.index.index_dir);
    let loaded = cache.get_or_load(&root);
    let Some(index) = loaded.index() else {
        println!("No duplicate index found in {}", root.display());
        return Ok(());
    };

    if index.vector(chunk_id).is_none() {
        println!("{}Chunk {} has no vector in this index{}", colors::MUTED, chunk_id, colors::RESET);
        return Ok(());
    }

    let results = query_with_limit(&BruteForceSearch, index, chunk_id, threshold, limit);
    if results.is_empty() {
        println!("No chunks at or above {:.2} similarity", threshold);
        return Ok(());
    }

    for result in &results {
        match index.record(&result.id) {
            Some(record) => println!(
                "{}{:.3}{}  {}{}:{}{}  {} {}  {}{}{}",
                colors::PRIMARY, result.score, colors::RESET,
                colors::FG, record.file_path, record.start_line, colors::RESET,
                record.kind,
                record.name.as_deref().unwrap_or("anonymous"),
                colors::MUTED, result.id, colors::RESET
            ),
            None => println!("{:.3}  {}", result.score, result.id),
        }
    }

    Ok(())
}
