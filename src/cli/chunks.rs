//! Chunks command - show how a file is carved up for indexing

use anyhow::Result;
use std::path::Path;

use nexus_dupes::chunk::{extract_chunks, split_chunks};
use nexus_dupes::config::Config;
use nexus_dupes::core::parser::CodeParser;

use super::colors;

pub fn run(config: Config, file: &str) -> Result<()> {
    let mut parser = CodeParser::new()?;
    let parsed = parser.parse_file(Path::new(file))?;

    let extracted = extract_chunks(&parsed.tree, &parsed.content, file, &config.extract_options());
    let chunks = split_chunks(extracted, &config.split_options());

    if chunks.is_empty() {
        println!("No chunks in {} ({} lines)", file, parsed.line_count);
        return Ok(());
    }

    for chunk in &chunks {
        let label = chunk
            .section_label
            .as_deref()
            .map(|l| format!(" [{}]", l))
            .unwrap_or_default();
        println!(
            "{}{:>5}-{:<5}{} {}{:<18}{} {}{}  {}{}{}",
            colors::MUTED, chunk.start_line, chunk.end_line, colors::RESET,
            colors::PRIMARY, chunk.kind.as_str(), colors::RESET,
            chunk.name.as_deref().unwrap_or("anonymous"), label,
            colors::MUTED, chunk.id, colors::RESET
        );
    }
    println!();
    println!("{} chunk(s) from {} ({})", chunks.len(), file, parsed.language);

    Ok(())
}
