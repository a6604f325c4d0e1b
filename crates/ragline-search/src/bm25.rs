//! BM25 Okapi scoring over an in-memory inverted index.
//!
//! Built once from a document snapshot and never mutated afterwards. A
//! refresh builds a new index and the owner swaps it in.

use std::collections::HashMap;

use ragline_core::defaults;

/// Lowercased whitespace tokens. Documents and queries share this tokenizer.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// A single entry in a posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Posting {
    doc: u32,
    term_frequency: u32,
}

/// Immutable BM25 index over a sequence of texts.
///
/// Documents are addressed by their position in the build input.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f64,
    k1: f64,
    b: f64,
}

impl Bm25Index {
    /// Build with the default `k1` / `b` parameters.
    pub fn build<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::build_with_params(texts, defaults::BM25_K1, defaults::BM25_B)
    }

    pub fn build_with_params<'a, I>(texts: I, k1: f64, b: f64) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::new();

        for (doc, text) in texts.into_iter().enumerate() {
            let tokens = tokenize(text);
            doc_lengths.push(tokens.len() as u32);

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for (term, term_frequency) in tf {
                postings.entry(term).or_default().push(Posting {
                    doc: doc as u32,
                    term_frequency,
                });
            }
        }

        let total: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            total as f64 / doc_lengths.len() as f64
        };

        Self {
            postings,
            doc_lengths,
            avg_doc_length,
            k1,
            b,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// Inverse document frequency: `ln((N - df + 0.5) / (df + 0.5) + 1)`.
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.len() as f64;
        let df = self.postings.get(term).map_or(0, Vec::len) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score every document against `query` and return the top `limit`
    /// `(position, score)` pairs.
    ///
    /// Only documents sharing at least one term with the query are returned.
    /// Ordered by score descending, ties by position.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(usize, f64)> {
        let terms = tokenize(query);
        if terms.is_empty() || self.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scores = vec![0.0f64; self.len()];
        for term in &terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(term);
            for posting in postings {
                let dl = self.doc_lengths[posting.doc as usize] as f64;
                let tf = posting.term_frequency as f64;
                let norm = if self.avg_doc_length > 0.0 {
                    1.0 - self.b + self.b * dl / self.avg_doc_length
                } else {
                    1.0
                };
                scores[posting.doc as usize] += idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm);
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // Stable sort keeps position order on ties.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Bm25Index {
        Bm25Index::build([
            "the quick brown fox",
            "the lazy dog sleeps",
            "quick quick fox jumps over the lazy dog",
        ])
    }

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(tokenize("  Rust\tIS  fast\n"), vec!["rust", "is", "fast"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_idf_formula() {
        let index = corpus();
        // "fox" appears in 2 of 3 docs.
        let expected = ((3.0 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0f64).ln();
        assert!((index.idf("fox") - expected).abs() < 1e-12);
        // Unknown terms have the maximum idf.
        let unseen = ((3.0 + 0.5) / 0.5 + 1.0f64).ln();
        assert!((index.idf("zebra") - unseen).abs() < 1e-12);
    }

    #[test]
    fn test_exact_score_single_term() {
        let index = Bm25Index::build(["alpha beta", "gamma"]);
        let results = index.search("alpha", 10);
        assert_eq!(results.len(), 1);

        let idf = ((2.0 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0f64).ln();
        let avgdl = 1.5;
        let tf_norm = (1.0 * 2.5) / (1.0 + 1.5 * (1.0 - 0.75 + 0.75 * 2.0 / avgdl));
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - idf * tf_norm).abs() < 1e-12);
    }

    #[test]
    fn test_higher_term_frequency_ranks_first() {
        let results = corpus().search("quick", 10);
        let positions: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(positions, vec![2, 0]);
    }

    #[test]
    fn test_non_matching_documents_excluded() {
        let results = corpus().search("sleeps", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
    }

    #[test]
    fn test_query_is_case_insensitive() {
        assert_eq!(corpus().search("QUICK Fox", 10), corpus().search("quick fox", 10));
    }

    #[test]
    fn test_ties_break_by_position() {
        let index = Bm25Index::build(["same text", "other", "same text"]);
        let results = index.search("same", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 2);
        assert_eq!(results[0].1, results[1].1);
    }

    #[test]
    fn test_limit_and_empty_cases() {
        let index = corpus();
        assert_eq!(index.search("the", 1).len(), 1);
        assert!(index.search("the", 0).is_empty());
        assert!(index.search("   ", 10).is_empty());
        assert!(index.search("nothing matches", 10).is_empty());

        let empty = Bm25Index::build(std::iter::empty::<&str>());
        assert!(empty.is_empty());
        assert!(empty.search("anything", 10).is_empty());
    }

    #[test]
    fn test_scores_sorted_descending() {
        let results = corpus().search("the lazy quick dog", 10);
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }
}
