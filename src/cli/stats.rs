//! Stats command - summarize an existing index

use anyhow::Result;
use std::path::Path;

use nexus_dupes::config::Config;
use nexus_dupes::index::store::{read_manifest, StoreError};

use super::colors;

pub fn run(config: Config, path: Option<&str>) -> Result<()> {
    let root = Path::new(path.unwrap_or("."));
    let dir = root.join(&config.index.index_dir);

    let manifest = match read_manifest(&dir) {
        Ok(manifest) => manifest,
        Err(StoreError::Missing(_)) => {
            println!("No duplicate index found in {}", dir.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}{}Duplicate index{} {}", colors::BOLD, colors::PRIMARY, colors::RESET, dir.display());
    println!("  {}Created:{}    {}", colors::MUTED, colors::RESET, manifest.created_at);
    println!("  {}Model:{}      {}", colors::MUTED, colors::RESET, manifest.model);
    println!("  {}Dimension:{}  {}", colors::MUTED, colors::RESET, manifest.dimension);
    println!("  {}Files:{}      {}", colors::MUTED, colors::RESET, manifest.file_count);
    println!("  {}Chunks:{}     {}", colors::MUTED, colors::RESET, manifest.chunk_count);
    println!("  {}Vectors:{}    {}", colors::MUTED, colors::RESET, manifest.vector_count);

    Ok(())
}
