//! Reciprocal Rank Fusion (RRF) for combining search results.

use std::collections::HashMap;

use tracing::{debug, trace};

use ragline_core::ScoredResult;

/// RRF constant. Every list contributes `1 / (RRF_K + rank)` per item, with
/// a 0-based rank. K=60 is the value from Cormack et al. (2009).
pub const RRF_K: f64 = ragline_core::defaults::RRF_K;

/// Contribution of a single 0-based rank.
pub fn rrf_score(rank: usize, k: f64) -> f64 {
    1.0 / (k + rank as f64)
}

/// Fuse ranked lists using Reciprocal Rank Fusion.
///
/// Lists are consumed in order (vector results first, then lexical). The
/// fused score of an id is the sum of its contributions across all lists and
/// replaces the original score. The first record seen for an id is kept as
/// the canonical payload. Ties on fused score keep first-seen order, so the
/// output is fully deterministic for fixed inputs.
pub fn rrf_fuse(ranked_lists: Vec<Vec<ScoredResult>>, k: f64, limit: usize) -> Vec<ScoredResult> {
    let num_lists = ranked_lists.len();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut fused: Vec<ScoredResult> = Vec::new();

    for list in ranked_lists {
        for (rank, hit) in list.into_iter().enumerate() {
            let contribution = rrf_score(rank, k);
            match slots.get(&hit.id) {
                Some(&slot) => fused[slot].score += contribution,
                None => {
                    slots.insert(hit.id.clone(), fused.len());
                    let mut canonical = hit;
                    canonical.score = contribution;
                    fused.push(canonical);
                }
            }
        }
    }

    // `sort_by` is stable: equal scores keep first-seen order.
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fused.truncate(limit);

    for hit in &fused {
        trace!(id = %hit.id, score = hit.score, source = %hit.source, "Fused hit");
    }
    debug!(
        input_lists = num_lists,
        rrf_k = k,
        result_count = fused.len(),
        "RRF fusion complete"
    );

    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::{ResultMetadata, ResultSource};

    fn hit(id: &str, score: f64, source: ResultSource) -> ScoredResult {
        ScoredResult::new(id, score, format!("content of {}", id), source)
    }

    fn ids(results: &[ScoredResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_rrf_score_is_zero_based() {
        assert!((rrf_score(0, 60.0) - 1.0 / 60.0).abs() < 1e-12);
        assert!((rrf_score(1, 60.0) - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn test_rrf_reference_scenario() {
        let vector = vec![
            hit("A", 0.9, ResultSource::Vector),
            hit("B", 0.8, ResultSource::Vector),
        ];
        let lexical = vec![
            hit("B", 12.0, ResultSource::Lexical),
            hit("C", 10.0, ResultSource::Lexical),
        ];

        let all = rrf_fuse(vec![vector.clone(), lexical.clone()], RRF_K, 10);
        assert_eq!(ids(&all), vec!["B", "A", "C"]);
        assert!((all[0].score - (1.0 / 61.0 + 1.0 / 60.0)).abs() < 1e-12);
        assert!((all[1].score - 1.0 / 60.0).abs() < 1e-12);
        assert!((all[2].score - 1.0 / 61.0).abs() < 1e-12);

        let top2 = rrf_fuse(vec![vector, lexical], RRF_K, 2);
        assert_eq!(ids(&top2), vec!["B", "A"]);
    }

    #[test]
    fn test_rrf_dedup_keeps_first_seen_payload() {
        let vector = vec![hit("B", 0.8, ResultSource::Vector)
            .with_metadata(ResultMetadata::new().with_title("from vector"))];
        let lexical = vec![hit("B", 12.0, ResultSource::Lexical)
            .with_metadata(ResultMetadata::new().with_title("from lexical"))];

        let results = rrf_fuse(vec![vector, lexical], RRF_K, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, ResultSource::Vector);
        assert_eq!(results[0].metadata.title.as_deref(), Some("from vector"));
        assert!((results[0].score - 2.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_rrf_ties_break_by_first_seen_order() {
        // X and Y both sit at rank 0 of their lists and tie exactly.
        let vector = vec![hit("X", 0.1, ResultSource::Vector)];
        let lexical = vec![hit("Y", 99.0, ResultSource::Lexical)];

        for _ in 0..20 {
            let results = rrf_fuse(vec![vector.clone(), lexical.clone()], RRF_K, 10);
            assert_eq!(ids(&results), vec!["X", "Y"]);
        }
    }

    #[test]
    fn test_rrf_is_deterministic() {
        let vector: Vec<ScoredResult> = (0..30)
            .map(|i| hit(&format!("v{}", i % 17), 1.0, ResultSource::Vector))
            .collect();
        let lexical: Vec<ScoredResult> = (0..30)
            .map(|i| hit(&format!("v{}", (i * 7) % 23), 1.0, ResultSource::Lexical))
            .collect();

        let first = rrf_fuse(vec![vector.clone(), lexical.clone()], RRF_K, 25);
        for _ in 0..10 {
            let again = rrf_fuse(vec![vector.clone(), lexical.clone()], RRF_K, 25);
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_rrf_each_id_appears_once() {
        let vector = vec![
            hit("a", 1.0, ResultSource::Vector),
            hit("b", 0.9, ResultSource::Vector),
            hit("c", 0.8, ResultSource::Vector),
        ];
        let lexical = vec![
            hit("c", 5.0, ResultSource::Lexical),
            hit("a", 4.0, ResultSource::Lexical),
            hit("d", 3.0, ResultSource::Lexical),
        ];

        let results = rrf_fuse(vec![vector, lexical], RRF_K, 10);
        assert_eq!(results.len(), 4);

        let a = results.iter().find(|r| r.id == "a").unwrap();
        assert!((a.score - (rrf_score(0, RRF_K) + rrf_score(1, RRF_K))).abs() < 1e-12);
        let c = results.iter().find(|r| r.id == "c").unwrap();
        assert!((c.score - (rrf_score(2, RRF_K) + rrf_score(0, RRF_K))).abs() < 1e-12);
    }

    #[test]
    fn test_rrf_respects_limit() {
        let hits: Vec<ScoredResult> = (0..100)
            .map(|i| hit(&format!("doc-{}", i), 1.0 - i as f64 * 0.01, ResultSource::Vector))
            .collect();
        let results = rrf_fuse(vec![hits], RRF_K, 10);
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].id, "doc-0");
    }

    #[test]
    fn test_rrf_limit_zero() {
        let results = rrf_fuse(vec![vec![hit("a", 1.0, ResultSource::Vector)]], RRF_K, 0);
        assert!(results.is_empty());
    }

    #[test]
    fn test_rrf_empty_inputs() {
        assert!(rrf_fuse(vec![], RRF_K, 10).is_empty());
        assert!(rrf_fuse(vec![vec![], vec![]], RRF_K, 10).is_empty());
    }

    #[test]
    fn test_rrf_single_list_preserves_order() {
        let lexical = vec![
            hit("z", 3.0, ResultSource::Fallback),
            hit("y", 2.0, ResultSource::Fallback),
            hit("x", 1.0, ResultSource::Fallback),
        ];
        let results = rrf_fuse(vec![vec![], lexical], RRF_K, 10);
        assert_eq!(ids(&results), vec!["z", "y", "x"]);
        assert!(results.iter().all(|r| r.source == ResultSource::Fallback));
    }

    #[test]
    fn test_rrf_sorted_descending() {
        let vector = vec![
            hit("a", 1.0, ResultSource::Vector),
            hit("b", 0.5, ResultSource::Vector),
            hit("c", 0.2, ResultSource::Vector),
        ];
        let lexical = vec![hit("c", 1.0, ResultSource::Lexical)];
        let results = rrf_fuse(vec![vector, lexical], RRF_K, 10);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].id, "c");
    }
}
