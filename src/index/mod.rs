//! Duplicate index building with CLI progress UI
//!
//! Parses every source file in scope, carves it into chunks, embeds each chunk
//! through the configured provider and rewrites the on-disk index in full.

pub mod store;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunk::{extract_chunks, split_chunks, CodeChunk};
use crate::config::Config;
use crate::core::parser::{CodeParser, Language};
use crate::embed::{build_embedding_input, EmbeddingProvider};
use store::{write_index, Manifest, VectorIndex};

/// Index location relative to the project root
pub const DEFAULT_INDEX_DIR: &str = ".nexus/duplicates-index";

// ANSI color codes from design system
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const PRIMARY: &str = "\x1b[38;2;100;181;246m";      // #64B5F6
    pub const SUCCESS: &str = "\x1b[38;2;165;214;167m";      // #A5D6A7
    pub const WARNING: &str = "\x1b[38;2;255;245;157m";      // #FFF59D
    pub const ERROR: &str = "\x1b[38;2;239;154;154m";        // #EF9A9A
    pub const AI_ACCENT: &str = "\x1b[38;2;255;202;40m";     // #FFCA28
    pub const MUTED: &str = "\x1b[38;2;84;110;122m";         // #546E7A
    pub const FG: &str = "\x1b[38;2;212;212;215m";           // #D4D4D7
}

mod symbols {
    pub const LOADING: &str = "󰊍";
    pub const SUCCESS: &str = "󰄂";
    pub const WARNING: &str = "⚠";
}

/// Result of an indexing pass
#[derive(Debug)]
pub struct IndexResult {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub chunks: usize,
    pub vectors: usize,
    pub embed_failures: usize,
    pub dimension: usize,
    pub time_taken_ms: u64,
    pub errors: Vec<(PathBuf, String)>,
    pub manifest: Option<Manifest>,
}

/// Index a project and write its duplicate index.
///
/// Unparsable files and failed embedding calls degrade the index, they never abort it.
pub async fn index_project(
    root: &Path,
    config: &Config,
    provider: Arc<dyn EmbeddingProvider>,
    show_ui: bool,
) -> Result<IndexResult> {
    let start_time = Instant::now();
    let root = root.canonicalize()
        .with_context(|| format!("Invalid path: {}", root.display()))?;

    if show_ui {
        print_header(&root, provider.model());
    }

    let files = collect_files(&root, config)?;
    info!("Found {} source files under {}", files.len(), root.display());

    let (chunks, errors) = chunk_files(&root, &files, config, show_ui)?;

    let inputs: Vec<String> = chunks
        .iter()
        .map(|c| build_embedding_input(c, config.embedding.max_chars))
        .collect();
    let vectors = embed_all(inputs, provider.clone(), config.embedding.concurrency, show_ui).await;

    let (index, embed_failures) = assemble_index(&chunks, vectors)?;

    let index_dir = root.join(&config.index.index_dir);
    let manifest = write_index(&index_dir, &index, provider.model())
        .with_context(|| format!("Failed to write index to {}", index_dir.display()))?;

    let result = IndexResult {
        files_scanned: files.len(),
        files_skipped: errors.len(),
        chunks: chunks.len(),
        vectors: index.len(),
        embed_failures,
        dimension: index.dimension(),
        time_taken_ms: start_time.elapsed().as_millis() as u64,
        errors,
        manifest: Some(manifest),
    };

    if show_ui {
        print_summary(&result);
    }

    Ok(result)
}

/// Collect all supported source files under `root`
pub fn collect_files(root: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    // Try to load .gitignore
    let gitignore_path = root.join(".gitignore");
    let gitignore = if gitignore_path.exists() {
        Gitignore::new(&gitignore_path).0
    } else {
        Gitignore::empty()
    };
    let excludes = exclude_matcher(root, &config.index.exclude_patterns);
    let max_bytes = u64::from(config.index.max_file_size_mb) * 1024 * 1024;

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let path = e.path();
            let name = e.file_name().to_string_lossy();
            let is_dir = e.file_type().is_dir();

            // Skip hidden entries and common non-source dirs
            if name.starts_with('.') { return false; }
            if name == "node_modules" { return false; }
            if name == "target" { return false; }

            if gitignore.matched(path, is_dir).is_ignore() {
                return false;
            }
            !excludes.matched(path, is_dir).is_ignore()
        })
    {
        let entry = entry?;
        let file_path = entry.path();

        if !entry.file_type().is_file() || !Language::from_path(file_path).is_supported() {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > max_bytes {
            debug!("Skipping {} ({} bytes)", file_path.display(), size);
            continue;
        }
        files.push(file_path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn exclude_matcher(root: &Path, patterns: &[String]) -> Gitignore {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        if let Err(e) = builder.add_line(None, pattern) {
            warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e);
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!("Failed to build exclude patterns: {}", e);
        Gitignore::empty()
    })
}

/// Project-relative path with `/` separators, as stored in the index
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse, extract and split every file
fn chunk_files(
    root: &Path,
    files: &[PathBuf],
    config: &Config,
    show_ui: bool,
) -> Result<(Vec<CodeChunk>, Vec<(PathBuf, String)>)> {
    let mut parser = CodeParser::new()
        .context("Failed to initialize code parser")?;
    let extract_options = config.extract_options();
    let split_options = config.split_options();

    let pb = create_progress_bar(files.len() as u64, "Chunking", show_ui);
    let mut chunks = Vec::new();
    let mut errors = Vec::new();

    for file_path in files {
        let relative = relative_path(root, file_path);
        pb.set_message(relative.clone());

        let source = match std::fs::read_to_string(file_path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Skipping {}: {}", relative, e);
                errors.push((file_path.clone(), e.to_string()));
                pb.inc(1);
                continue;
            }
        };

        let language = Language::from_path(file_path);
        match parser.parse_source(&source, language) {
            Ok(tree) => {
                let extracted = extract_chunks(&tree, &source, &relative, &extract_options);
                chunks.extend(split_chunks(extracted, &split_options));
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", relative, e);
                errors.push((file_path.clone(), format!("{:#}", e)));
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok((chunks, errors))
}

/// Embed every input through a bounded pool of workers.
///
/// Slot `i` of the result holds the vector of input `i`, or `None` if its call failed.
async fn embed_all(
    inputs: Vec<String>,
    provider: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
    show_ui: bool,
) -> Vec<Option<Vec<f32>>> {
    let total = inputs.len();
    let mut vectors: Vec<Option<Vec<f32>>> = vec![None; total];
    if total == 0 {
        return vectors;
    }

    let workers = concurrency.clamp(1, total);
    let (job_tx, job_rx) = async_channel::bounded::<(usize, String)>(workers * 2);
    let (result_tx, result_rx) = async_channel::unbounded();

    for _ in 0..workers {
        let jobs = job_rx.clone();
        let results = result_tx.clone();
        let provider = Arc::clone(&provider);
        tokio::spawn(async move {
            while let Ok((slot, text)) = jobs.recv().await {
                let outcome = provider.embed(&text).await;
                if results.send((slot, outcome)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(job_rx);
    drop(result_tx);

    let feeder = tokio::spawn(async move {
        for job in inputs.into_iter().enumerate() {
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
    });

    let pb = create_progress_bar(total as u64, "Embedding", show_ui);
    while let Ok((slot, outcome)) = result_rx.recv().await {
        match outcome {
            Ok(vector) => vectors[slot] = Some(vector),
            Err(e) => warn!("Embedding failed for chunk {}: {}", slot, e),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if let Err(e) = feeder.await {
        warn!("Embedding feeder stopped early: {}", e);
    }

    vectors
}

/// Pair chunks with their vectors; chunks without a usable vector stay metadata-only
fn assemble_index(
    chunks: &[CodeChunk],
    vectors: Vec<Option<Vec<f32>>>,
) -> Result<(VectorIndex, usize)> {
    let dimension = vectors.iter().flatten().map(Vec::len).next().unwrap_or(0);
    let mut failures = 0;
    let mut rows = Vec::new();
    let mut records = Vec::with_capacity(chunks.len());

    for (chunk, vector) in chunks.iter().zip(vectors) {
        records.push(chunk.to_record());
        match vector {
            Some(v) if v.len() == dimension => rows.push((chunk.id.clone(), v)),
            Some(v) => {
                warn!(
                    "Dropping vector for {}: {} dimensions, index uses {}",
                    chunk.id,
                    v.len(),
                    dimension
                );
                failures += 1;
            }
            None => failures += 1,
        }
    }

    let index = VectorIndex::build(records, rows).context("Failed to assemble vector index")?;
    Ok((index, failures))
}

/// Create a styled progress bar, hidden when the UI is off
fn create_progress_bar(total: u64, prefix: &'static str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);

    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.cyan} {prefix:.bold} [{bar:40.cyan/dim}] {pos}/{len} {msg:.dim}")
    {
        pb.set_style(style
            .progress_chars("█▓░")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }

    pb.set_prefix(prefix);
    pb.enable_steady_tick(Duration::from_millis(80));

    pb
}

/// Print the indexing header
fn print_header(path: &Path, model: &str) {
    println!();
    println!(
        "{}{}╭─ {} NEXUS Duplicate Index ───────────────────────────────────╮{}",
        colors::PRIMARY, colors::BOLD, symbols::LOADING, colors::RESET
    );
    println!(
        "{}│{}  Target: {}{}{}",
        colors::PRIMARY, colors::RESET, colors::FG, truncate_path(path, 50), colors::RESET
    );
    println!(
        "{}│{}  Model:  {}{}{}",
        colors::PRIMARY, colors::RESET, colors::MUTED, model, colors::RESET
    );
    println!(
        "{}╰──────────────────────────────────────────────────────────────╯{}",
        colors::PRIMARY, colors::RESET
    );
    println!();
}

/// Print the indexing summary
fn print_summary(result: &IndexResult) {
    println!();

    let degraded = result.files_skipped > 0 || result.embed_failures > 0;
    let (icon, color, title) = if degraded {
        (symbols::WARNING, colors::WARNING, "Indexing Completed with Warnings")
    } else {
        (symbols::SUCCESS, colors::SUCCESS, "Indexing Successful")
    };

    println!(
        "{}{}╭─ {} {} ─────────────────────────────────────────╮{}",
        color, colors::BOLD, icon, title, colors::RESET
    );
    println!(
        "{}│{}  {}Files Scanned:{}     {}{:>6}{}",
        color, colors::RESET, colors::MUTED, colors::RESET, colors::FG, result.files_scanned, colors::RESET
    );
    println!(
        "{}│{}  {}Chunks:{}            {}{:>6}{}",
        color, colors::RESET, colors::MUTED, colors::RESET, colors::AI_ACCENT, result.chunks, colors::RESET
    );
    println!(
        "{}│{}  {}Vectors:{}           {}{:>6}{}  ({} dims)",
        color, colors::RESET, colors::MUTED, colors::RESET, colors::FG, result.vectors, colors::RESET, result.dimension
    );
    println!(
        "{}│{}  {}Time Elapsed:{}      {}{:.2}s{}",
        color, colors::RESET, colors::MUTED, colors::RESET, colors::FG, result.time_taken_ms as f64 / 1000.0, colors::RESET
    );

    if result.files_skipped > 0 {
        println!(
            "{}│{}  {}Skipped Files (Parse Error): {}{}",
            color, colors::RESET, colors::ERROR, result.files_skipped, colors::RESET
        );
    }
    if result.embed_failures > 0 {
        println!(
            "{}│{}  {}Chunks Without Vectors: {}{}",
            color, colors::RESET, colors::ERROR, result.embed_failures, colors::RESET
        );
    }

    println!(
        "{}╰──────────────────────────────────────────────────────────────╯{}",
        color, colors::RESET
    );
    println!();
}

/// Truncate a path for display
fn truncate_path(path: &Path, max_len: usize) -> String {
    let s = path.display().to_string();
    if s.chars().count() <= max_len {
        s
    } else {
        let tail: String = s.chars().rev().take(max_len - 3).collect::<Vec<_>>().into_iter().rev().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkKind;
    use crate::embed::testing::TokenEmbedder;
    use crate::index::store::load_index;
    use crate::search::{BruteForceSearch, SimilaritySearch};
    use std::fs;
    use std::sync::atomic::Ordering;

    const TOTAL_A: &str = r#"export function sumPrices(items) {
  let total = 0;
  for (const item of items) {
    total += item.price * item.quantity;
  }
  const discount = total > 100 ? total * 0.1 : 0;
  return total - discount;
}
"#;

    const TOTAL_B: &str = r#"export function computeTotal(items) {
  let total = 0;
  for (const item of items) {
    total += item.price * item.quantity;
  }
  const discount = total > 100 ? total * 0.1 : 0;
  return total - discount;
}
"#;

    const PANEL: &str = r#"import { useState } from "react";

export const SettingsPanel = ({ open, onClose }) => {
  const [tab, setTab] = useState("general");
  return (
    <aside className="settings">
      <nav>{tab}</nav>
      <button onClick={onClose}>Close</button>
    </aside>
  );
};
"#;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/cart")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
        fs::write(dir.path().join("src/cart/sum.js"), TOTAL_A).unwrap();
        fs::write(dir.path().join("src/total.ts"), TOTAL_B).unwrap();
        fs::write(dir.path().join("src/Settings.jsx"), PANEL).unwrap();
        fs::write(dir.path().join("src/broken.js"), "function ( {").unwrap();
        fs::write(dir.path().join("node_modules/lib/index.js"), TOTAL_A).unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();
        dir
    }

    #[test]
    fn test_collect_files_skips_vendor_and_unknown() {
        let dir = project();
        let root = dir.path().canonicalize().unwrap();
        let files: Vec<String> = collect_files(&root, &Config::default())
            .unwrap()
            .iter()
            .map(|f| relative_path(&root, f))
            .collect();
        assert_eq!(
            files,
            vec!["src/Settings.jsx", "src/broken.js", "src/cart/sum.js", "src/total.ts"]
        );
    }

    #[test]
    fn test_exclude_patterns_apply() {
        let dir = project();
        let root = dir.path().canonicalize().unwrap();
        let mut config = Config::default();
        config.index.exclude_patterns.push("cart/".to_string());
        let files = collect_files(&root, &config).unwrap();
        assert!(files.iter().all(|f| !relative_path(&root, f).contains("cart")));
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/work/app");
        assert_eq!(relative_path(root, Path::new("/work/app/src/ui/Button.tsx")), "src/ui/Button.tsx");
    }

    #[tokio::test]
    async fn test_index_project_end_to_end() {
        let dir = project();
        let embedder = Arc::new(TokenEmbedder::default());
        let provider: Arc<dyn EmbeddingProvider> = embedder.clone();

        let result = index_project(dir.path(), &Config::default(), provider, false)
            .await
            .unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.files_scanned, 4);
        assert_eq!(result.files_skipped, 1);
        assert_eq!(result.chunks, 3);
        assert_eq!(result.vectors, 3);
        assert_eq!(result.embed_failures, 0);

        let index = load_index(&dir.path().join(DEFAULT_INDEX_DIR)).unwrap();
        let sum_id = index.chunks_for_file("src/cart/sum.js")[0].clone();
        let total_id = index.chunks_for_file("src/total.ts")[0].clone();
        assert_eq!(index.record(&sum_id).unwrap().kind, ChunkKind::Function);

        let results = BruteForceSearch.query(&index, &sum_id, 0.85);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, total_id);
        assert!(results[0].score > 0.9);
    }

    #[tokio::test]
    async fn test_failed_embeddings_degrade_instead_of_abort() {
        let dir = project();
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TokenEmbedder::failing_on("SettingsPanel"));

        let result = index_project(dir.path(), &Config::default(), provider, false)
            .await
            .unwrap();

        assert_eq!(result.chunks, 3);
        assert_eq!(result.vectors, 2);
        assert_eq!(result.embed_failures, 1);

        let index = load_index(&dir.path().join(DEFAULT_INDEX_DIR)).unwrap();
        let panel_id = &index.chunks_for_file("src/Settings.jsx")[0];
        assert!(index.record(panel_id).is_some());
        assert!(index.vector(panel_id).is_none());
        assert!(BruteForceSearch.query(&index, panel_id, 0.0).is_empty());
    }

    fn chunk(name: &str, line: usize) -> CodeChunk {
        let content = format!("function {}() {{\n  return 1;\n}}", name);
        CodeChunk {
            id: crate::chunk::chunk_id("src/a.js", line, &content),
            file_path: "src/a.js".into(),
            start_line: line,
            end_line: line + 2,
            start_column: 1,
            end_column: 2,
            kind: ChunkKind::Function,
            name: Some(name.to_string()),
            content,
            metadata: Default::default(),
            parent_id: None,
            section_index: None,
            section_label: None,
            markup: None,
        }
    }

    #[test]
    fn test_mismatched_dimension_is_dropped_and_counted() {
        let chunks = vec![chunk("first", 1), chunk("second", 5), chunk("third", 9)];
        let vectors = vec![Some(vec![1.0, 0.0, 0.0]), Some(vec![1.0, 0.0]), None];

        let (index, failures) = assemble_index(&chunks, vectors).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension(), 3);
        assert_eq!(failures, 2);
        assert_eq!(index.chunk_count(), 3);
        assert!(index.vector(&chunks[1].id).is_none());
        assert!(index.record(&chunks[1].id).is_some());
    }
}
