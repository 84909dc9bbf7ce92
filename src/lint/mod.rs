//! Lint-time duplicate detection
//!
//! Walks a file's syntax tree and asks the duplicate index whether the code
//! covering each node already exists elsewhere.

pub mod adapter;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};
use tree_sitter::Node;

pub use adapter::DuplicateCheck;

use crate::chunk::ChunkKind;
use crate::core::cache::IndexCache;
use crate::core::parser::{start_line, CodeParser};
use crate::search::BruteForceSearch;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOptions {
    /// Minimum cosine similarity for a match
    pub threshold: f32,
    /// Matches against chunks shorter than this are ignored
    pub min_lines: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            min_lines: 3,
        }
    }
}

/// A chunk that closely matches code elsewhere in the project
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateFinding {
    /// Line of the node that triggered the check
    pub line: usize,
    pub chunk_id: String,
    pub kind: ChunkKind,
    pub name: String,
    pub matched_name: String,
    /// `path:startLine` of the best match
    pub matched_location: String,
    /// Rounded percentage
    pub similarity: u32,
}

impl DuplicateFinding {
    pub fn message(&self) -> String {
        format!(
            "{} \"{}\" is {}% similar to \"{}\" ({})",
            self.kind.label(),
            self.name,
            self.similarity,
            self.matched_name,
            self.matched_location
        )
    }
}

/// Run the duplicate check over one file.
///
/// A missing index or an unparsable file yields no findings rather than an error.
pub fn lint_file(
    cache: &IndexCache,
    root: &Path,
    path: &Path,
    options: &CheckOptions,
) -> Result<Vec<DuplicateFinding>> {
    let root = root.canonicalize()
        .with_context(|| format!("Invalid project root: {}", root.display()))?;
    let path = path.canonicalize()
        .with_context(|| format!("File not found: {}", path.display()))?;

    let mut check = DuplicateCheck::new(cache, &root, &path, BruteForceSearch, options.clone());
    if !check.has_index() {
        debug!("No duplicate index for {}", root.display());
        return Ok(check.finish());
    }

    let mut parser = CodeParser::new().context("Failed to initialize code parser")?;
    let parsed = match parser.parse_file(&path) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Skipping duplicate check for {}: {:#}", path.display(), e);
            return Ok(check.finish());
        }
    };

    let mut stack: Vec<Node> = vec![parsed.tree.root_node()];
    while let Some(node) = stack.pop() {
        // Every named node, so line-window sections without a function start are covered
        check.visit(start_line(node));

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    Ok(check.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{extract_chunks, split_chunks, ChunkRecord, ExtractOptions, SplitOptions};
    use crate::core::parser::Language;
    use crate::embed::testing::token_vector;
    use crate::index::store::{write_index, VectorIndex};
    use std::fs;

    const CARD: &str = r#"export function PriceCard({ price, label }) {
  const formatted = price.toFixed(2);
  return (
    <div className="card">
      <span>{label}</span>
      <strong>{formatted}</strong>
    </div>
  );
}
"#;

    const TILE: &str = r#"import React from "react";

export function PriceTile({ price, label }) {
  const formatted = price.toFixed(2);
  return (
    <div className="card">
      <span>{label}</span>
      <strong>{formatted}</strong>
    </div>
  );
}
"#;

    fn index_sources(root: &Path, cache: &IndexCache, files: &[(&str, &str)]) {
        let mut parser = CodeParser::new().unwrap();
        let mut chunks = Vec::new();
        for (file, source) in files {
            fs::create_dir_all(root.join(file).parent().unwrap()).unwrap();
            fs::write(root.join(file), source).unwrap();
            let tree = parser.parse_source(source, Language::Tsx).unwrap();
            let extracted = extract_chunks(&tree, source, file, &ExtractOptions::default());
            chunks.extend(split_chunks(extracted, &SplitOptions::default()));
        }
        let records = chunks.iter().map(|c| c.to_record()).collect();
        let rows = chunks
            .iter()
            .map(|c| (c.id.clone(), token_vector(&c.content)))
            .collect();
        let index = VectorIndex::build(records, rows).unwrap();
        write_index(&cache.index_dir_for(root), &index, "token-bag").unwrap();
    }

    #[test]
    fn test_lint_file_reports_copy() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let cache = IndexCache::default();
        index_sources(&root, &cache, &[("src/Card.tsx", CARD), ("src/Tile.tsx", TILE)]);

        let findings = lint_file(&cache, &root, &root.join("src/Tile.tsx"), &CheckOptions::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, ChunkKind::Component);
        assert_eq!(findings[0].name, "PriceTile");
        assert_eq!(findings[0].matched_name, "PriceCard");
        assert_eq!(findings[0].matched_location, "src/Card.tsx:1");
        assert!(findings[0].similarity >= 85);
    }

    #[test]
    fn test_lint_file_without_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Card.tsx"), CARD).unwrap();
        let cache = IndexCache::default();

        let findings = lint_file(&cache, dir.path(), &dir.path().join("Card.tsx"), &CheckOptions::default()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_finding_message() {
        let finding = DuplicateFinding {
            line: 4,
            chunk_id: "abc".into(),
            kind: ChunkKind::Hook,
            name: "useCart".into(),
            matched_name: "useBasket".into(),
            matched_location: "src/basket.ts:7".into(),
            similarity: 92,
        };
        assert_eq!(finding.message(), "Hook \"useCart\" is 92% similar to \"useBasket\" (src/basket.ts:7)");
    }

    fn long_function(lines: usize) -> String {
        let mut source = String::from("export function applyDefaults(state) {\n");
        for i in 1..=lines - 2 {
            source.push_str(&format!("  state.v{i} = state.v{i} + {i};\n", i = i));
        }
        source.push_str("}\n");
        source
    }

    #[test]
    fn test_lint_file_checks_every_line_window() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let cache = IndexCache::default();

        let source = long_function(243);
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/defaults.js"), &source).unwrap();

        let mut parser = CodeParser::new().unwrap();
        let tree = parser.parse_source(&source, Language::JavaScript).unwrap();
        let extracted = extract_chunks(&tree, &source, "src/defaults.js", &ExtractOptions::default());
        let chunks = split_chunks(extracted, &SplitOptions::default());
        let spans: Vec<_> = chunks.iter().map(|c| (c.kind, c.start_line, c.end_line)).collect();
        assert_eq!(
            spans,
            vec![
                (ChunkKind::FunctionSummary, 1, 100),
                (ChunkKind::FunctionSection, 91, 190),
                (ChunkKind::FunctionSection, 181, 243),
            ]
        );

        // Each window gets its own axis; the two sections have twins elsewhere
        let mut records: Vec<ChunkRecord> = chunks.iter().map(|c| c.to_record()).collect();
        let mut rows: Vec<(String, Vec<f32>)> = Vec::new();
        for (axis, chunk) in chunks.iter().enumerate() {
            let mut vector = vec![0.0; 3];
            vector[axis] = 1.0;
            rows.push((chunk.id.clone(), vector.clone()));

            if chunk.kind == ChunkKind::FunctionSection {
                let mut twin = chunk.to_record();
                twin.id = format!("twin-{}", axis);
                twin.file_path = "src/other.js".into();
                twin.name = Some(format!("copy{}", axis));
                rows.push((twin.id.clone(), vector));
                records.push(twin);
            }
        }
        let index = VectorIndex::build(records, rows).unwrap();
        write_index(&cache.index_dir_for(&root), &index, "test").unwrap();

        let findings = lint_file(&cache, &root, &root.join("src/defaults.js"), &CheckOptions::default()).unwrap();
        let matched: Vec<_> = findings.iter().map(|f| (f.kind, f.matched_location.as_str())).collect();
        assert_eq!(
            matched,
            vec![
                (ChunkKind::FunctionSection, "src/other.js:91"),
                (ChunkKind::FunctionSection, "src/other.js:181"),
            ]
        );
    }
}
