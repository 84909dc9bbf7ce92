//! Similarity search over a loaded vector index

use serde::Serialize;

use crate::index::store::VectorIndex;

/// One ranked neighbour of a queried chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub id: String,
    pub score: f32,
}

/// Nearest-neighbour lookup over the chunks of one index
pub trait SimilaritySearch {
    /// Chunks whose similarity to `chunk_id` is at least `threshold`, best first.
    /// The queried chunk is never part of its own results.
    fn query(&self, index: &VectorIndex, chunk_id: &str, threshold: f32) -> Vec<QueryResult>;
}

/// Exhaustive cosine scan, O(chunks x dimension) per query
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceSearch;

impl SimilaritySearch for BruteForceSearch {
    fn query(&self, index: &VectorIndex, chunk_id: &str, threshold: f32) -> Vec<QueryResult> {
        let Some(target) = index.vector(chunk_id) else {
            return Vec::new();
        };

        let mut results: Vec<QueryResult> = index
            .iter_vectors()
            .filter(|(id, _)| *id != chunk_id)
            .map(|(id, vector)| QueryResult {
                id: id.to_string(),
                score: cosine_similarity(target, vector),
            })
            .filter(|r| r.score >= threshold)
            .collect();

        // Stable sort keeps row order among equal scores
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }
}

/// Query and keep at most `limit` results
pub fn query_with_limit<S: SimilaritySearch + ?Sized>(
    search: &S,
    index: &VectorIndex,
    chunk_id: &str,
    threshold: f32,
    limit: usize,
) -> Vec<QueryResult> {
    let mut results = search.query(index, chunk_id, threshold);
    results.truncate(limit);
    results
}

/// Cosine similarity; zero when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkKind, ChunkMetadata, ChunkRecord};

    fn record(id: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            file_path: format!("src/{}.ts", id),
            start_line: 1,
            end_line: 5,
            start_column: 1,
            end_column: 2,
            kind: ChunkKind::Function,
            name: Some(id.to_string()),
            metadata: ChunkMetadata::default(),
            parent_id: None,
            section_index: None,
            section_label: None,
        }
    }

    fn index(rows: Vec<(&str, Vec<f32>)>) -> VectorIndex {
        let records = rows.iter().map(|(id, _)| record(id)).collect();
        let rows = rows.into_iter().map(|(id, v)| (id.to_string(), v)).collect();
        VectorIndex::build(records, rows).unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_query_ranks_and_excludes_self() {
        let idx = index(vec![
            ("a", vec![1.0, 0.0, 0.0]),
            ("b", vec![0.9, 0.1, 0.0]),
            ("c", vec![0.0, 1.0, 0.0]),
            ("d", vec![1.0, 0.0, 0.0]),
        ]);

        let results = BruteForceSearch.query(&idx, "a", 0.5);
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_row_order() {
        let idx = index(vec![
            ("q", vec![1.0, 0.0]),
            ("z", vec![2.0, 0.0]),
            ("m", vec![3.0, 0.0]),
            ("a", vec![4.0, 0.0]),
        ]);
        let ids: Vec<_> = BruteForceSearch
            .query(&idx, "q", 0.0)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["z", "m", "a"]);
    }

    #[test]
    fn test_unknown_chunk_has_no_results() {
        let idx = index(vec![("a", vec![1.0, 0.0])]);
        assert!(BruteForceSearch.query(&idx, "missing", -1.0).is_empty());
    }

    #[test]
    fn test_threshold_monotonicity() {
        let idx = index(vec![
            ("a", vec![1.0, 0.2, 0.0]),
            ("b", vec![0.8, 0.6, 0.0]),
            ("c", vec![0.1, 1.0, 0.3]),
            ("d", vec![-1.0, 0.0, 0.0]),
            ("e", vec![0.0, 0.0, 0.0]),
        ]);

        let thresholds = [-1.0, -0.5, 0.0, 0.3, 0.6, 0.9, 1.0];
        for pair in thresholds.windows(2) {
            let low: Vec<_> = BruteForceSearch.query(&idx, "a", pair[0]).into_iter().map(|r| r.id).collect();
            let high: Vec<_> = BruteForceSearch.query(&idx, "a", pair[1]).into_iter().map(|r| r.id).collect();
            assert!(high.iter().all(|id| low.contains(id)));
            assert!(!low.contains(&"a".to_string()));
        }
    }

    #[test]
    fn test_identical_duplicates_score_one() {
        let body = vec![0.3, -0.2, 0.9, 0.1];
        let idx = index(vec![
            ("first", body.clone()),
            ("second", body),
            ("other", vec![-0.9, 0.4, 0.0, 0.2]),
        ]);

        let results = BruteForceSearch.query(&idx, "first", 0.85);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "second");
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_query_with_limit() {
        let idx = index(vec![
            ("a", vec![1.0, 0.0]),
            ("b", vec![1.0, 0.1]),
            ("c", vec![1.0, 0.2]),
        ]);
        assert_eq!(query_with_limit(&BruteForceSearch, &idx, "a", 0.0, 1).len(), 1);
    }
}
