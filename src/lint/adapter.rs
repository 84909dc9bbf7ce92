//! Per-file duplicate check driven by a linting pass

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{CheckOptions, DuplicateFinding};
use crate::core::cache::{IndexCache, LoadedIndex};
use crate::index::relative_path;
use crate::search::{BruteForceSearch, SimilaritySearch};

/// Query state for one linted file.
///
/// Each indexed chunk is checked at most once, however many visited nodes fall inside it.
pub struct DuplicateCheck<S: SimilaritySearch = BruteForceSearch> {
    loaded: Arc<LoadedIndex>,
    file: String,
    search: S,
    options: CheckOptions,
    checked: HashSet<String>,
    findings: Vec<DuplicateFinding>,
}

impl<S: SimilaritySearch> DuplicateCheck<S> {
    /// `file` must live under `root`; the index is looked up through `cache`
    pub fn new(cache: &IndexCache, root: &Path, file: &Path, search: S, options: CheckOptions) -> Self {
        Self {
            loaded: cache.get_or_load(root),
            file: relative_path(root, file),
            search,
            options,
            checked: HashSet::new(),
            findings: Vec::new(),
        }
    }

    pub fn has_index(&self) -> bool {
        self.loaded.index().is_some()
    }

    /// Check the chunks covering `line`; returns how many new findings were produced
    pub fn visit(&mut self, line: usize) -> usize {
        let Some(index) = self.loaded.index() else {
            return 0;
        };

        let before = self.findings.len();
        for id in index.chunks_for_file(&self.file) {
            let Some(record) = index.record(id) else {
                continue;
            };
            if !record.contains_line(line) || !self.checked.insert(id.clone()) {
                continue;
            }

            let results = self.search.query(index, id, self.options.threshold);
            let Some(best) = results.first() else {
                continue;
            };
            let Some(matched) = index.record(&best.id) else {
                continue;
            };
            if matched.line_count() < self.options.min_lines {
                debug!("Suppressed match {} for {}: {} lines", best.id, id, matched.line_count());
                continue;
            }

            self.findings.push(DuplicateFinding {
                line,
                chunk_id: id.clone(),
                kind: record.kind,
                name: display_name(record.name.as_deref()),
                matched_name: display_name(matched.name.as_deref()),
                matched_location: format!("{}:{}", matched.file_path, matched.start_line),
                similarity: (best.score * 100.0).round().max(0.0) as u32,
            });
        }

        self.findings.len() - before
    }

    /// End of file: hand back every finding in visit order
    pub fn finish(self) -> Vec<DuplicateFinding> {
        debug!(
            "{}: {} chunks checked, {} duplicates",
            self.file,
            self.checked.len(),
            self.findings.len()
        );
        self.findings
    }
}

fn display_name(name: Option<&str>) -> String {
    name.unwrap_or("anonymous").to_string()
}
