//! In-process lexical fallback over a bounded document snapshot.

use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use ragline_core::{ScoredResult, SnapshotDocument};

use crate::bm25::Bm25Index;

/// A loaded snapshot and the BM25 index built over it.
#[derive(Debug)]
pub struct Bm25Snapshot {
    documents: Vec<SnapshotDocument>,
    index: Bm25Index,
}

impl Bm25Snapshot {
    /// Build from scanned documents. Documents with blank content are dropped.
    pub fn build(documents: Vec<SnapshotDocument>) -> Self {
        let documents: Vec<SnapshotDocument> = documents
            .into_iter()
            .filter(|doc| !doc.content.trim().is_empty())
            .collect();
        let index = Bm25Index::build(documents.iter().map(|doc| doc.content.as_str()));
        Self { documents, index }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<ScoredResult> {
        self.index
            .search(query, limit)
            .into_iter()
            .map(|(position, score)| self.documents[position].to_result(score))
            .collect()
    }
}

/// Swappable fallback snapshot.
///
/// Readers clone the current `Arc` under a short read lock and score without
/// holding it. [`FallbackIndex::replace`] swaps the pointer, so a reader sees
/// either the old snapshot or the new one.
#[derive(Debug, Default)]
pub struct FallbackIndex {
    current: RwLock<Option<Arc<Bm25Snapshot>>>,
}

impl FallbackIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new snapshot off-lock and install it. Returns the number of
    /// documents indexed.
    pub fn replace(&self, documents: Vec<SnapshotDocument>) -> usize {
        let snapshot = Arc::new(Bm25Snapshot::build(documents));
        let count = snapshot.len();

        match self.current.write() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }

        info!(document_count = count, "Fallback index replaced");
        count
    }

    fn snapshot(&self) -> Option<Arc<Bm25Snapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn document_count(&self) -> usize {
        self.snapshot().map_or(0, |s| s.len())
    }

    /// Top `limit` BM25 matches tagged as fallback results. Empty when no
    /// snapshot has been loaded.
    ///
    /// Only documents sharing a term with the query are returned; zero-score
    /// documents are never padded in to reach `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ScoredResult> {
        let Some(snapshot) = self.snapshot() else {
            debug!("Fallback index not initialized, returning no results");
            return Vec::new();
        };
        let results = snapshot.search(query, limit);
        debug!(
            result_count = results.len(),
            document_count = snapshot.len(),
            "Fallback search complete"
        );
        results
    }
}
