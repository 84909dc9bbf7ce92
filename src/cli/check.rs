//! Check command - report duplicated code in the given files

use anyhow::{Context, Result};
use std::path::Path;

use nexus_dupes::config::Config;
use nexus_dupes::core::cache::IndexCache;
use nexus_dupes::lint::{lint_file, DuplicateFinding};

use super::colors;

pub fn run(config: Config, files: &[String], root: &str, threshold: Option<f32>, json: bool) -> Result<()> {
    let root = Path::new(root);
    let mut options = config.check_options();
    if let Some(threshold) = threshold {
        options.threshold = threshold;
    }

    let cache = IndexCache::new(&config.index.index_dir);
    let canonical_root = root.canonicalize()
        .with_context(|| format!("Invalid project root: {}", root.display()))?;
    if cache.get_or_load(&canonical_root).index().is_none() {
        if json {
            println!("[]");
        } else {
            println!(
                "{}No duplicate index found in {}. Run `nexus-dupes index` first.{}",
                colors::MUTED,
                canonical_root.display(),
                colors::RESET
            );
        }
        return Ok(());
    }

    let mut all: Vec<(String, DuplicateFinding)> = Vec::new();
    for file in files {
        let findings = lint_file(&cache, &canonical_root, Path::new(file), &options)?;
        all.extend(findings.into_iter().map(|f| (file.clone(), f)));
    }

    if json {
        let findings: Vec<&DuplicateFinding> = all.iter().map(|(_, f)| f).collect();
        println!("{}", serde_json::to_string_pretty(&findings)?);
        return Ok(());
    }

    for (file, finding) in &all {
        println!(
            "{}{}:{}{}  {}{}{}",
            colors::FG, file, finding.line, colors::RESET,
            colors::WARNING, finding.message(), colors::RESET
        );
    }

    if all.is_empty() {
        println!("{}No duplicates found{}", colors::SUCCESS, colors::RESET);
    } else {
        println!();
        println!(
            "{}{}{} possible duplicate(s){}",
            colors::BOLD, colors::WARNING, all.len(), colors::RESET
        );
    }

    Ok(())
}
