//! Test helpers for retrieval tests.
//!
//! In-memory backends with call counters plus failure and delay injection.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use ragline_search::{
    CacheBackend, CacheConfig, Embedding, EmbeddingBackend, Error, HybridRetriever,
    LexicalBackend, LexicalHit, LexicalQuery, Payload, Result, ResultCache, RetrieverConfig,
    SnapshotDocument, VectorHit, VectorPoint, VectorStore,
};

pub const DIMENSION: usize = 4;

async fn pause(delay: &Mutex<Duration>) {
    let delay = *delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub fn payload(content: &str, title: Option<&str>) -> Payload {
    let mut payload = Payload::new();
    payload.insert("content".into(), json!(content));
    if let Some(title) = title {
        payload.insert("title".into(), json!(title));
    }
    payload
}

pub fn vector_hit(id: &str, score: f64) -> VectorHit {
    VectorHit {
        id: id.to_string(),
        score,
        payload: payload(&format!("vector content {}", id), None),
    }
}

pub fn lexical_hit(id: &str, score: f64) -> LexicalHit {
    LexicalHit {
        id: id.to_string(),
        score,
        document: payload(&format!("lexical content {}", id), None),
    }
}

// =============================================================================
// EMBEDDER
// =============================================================================

#[derive(Default)]
pub struct MockEmbedder {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub delay: Mutex<Duration>,
    /// Overrides the length of returned vectors when set.
    pub output_dimension: Mutex<Option<usize>>,
}

impl MockEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        pause(&self.delay).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Embedding("embedder down".into()));
        }
        let dim = self.output_dimension.lock().unwrap().unwrap_or(DIMENSION);
        Ok(texts
            .iter()
            .map(|t| {
                let seed = t.len() as f32;
                (0..dim).map(|i| seed + i as f32).collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

// =============================================================================
// VECTOR STORE
// =============================================================================

#[derive(Default)]
pub struct MockVectorStore {
    pub hits: Mutex<Vec<VectorHit>>,
    pub points: Mutex<Vec<VectorPoint>>,
    pub search_calls: AtomicUsize,
    pub ensure_calls: AtomicUsize,
    pub last_limit: Mutex<Option<usize>>,
    pub fail: AtomicBool,
    pub delay: Mutex<Duration>,
}

impl MockVectorStore {
    pub fn with_hits(hits: Vec<VectorHit>) -> Self {
        let store = Self::default();
        *store.hits.lock().unwrap() = hits;
        store
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn ensure_collection(&self, _dimension: usize) -> Result<()> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::backend("vector", "upsert failed"));
        }
        self.points.lock().unwrap().extend(points);
        Ok(())
    }

    async fn search(&self, _vector: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_limit.lock().unwrap() = Some(limit);
        pause(&self.delay).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::backend("vector", "store down"));
        }
        Ok(self.hits.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

// =============================================================================
// LEXICAL BACKEND
// =============================================================================

pub struct MockLexical {
    pub hits: Mutex<Vec<LexicalHit>>,
    pub documents: Mutex<Vec<SnapshotDocument>>,
    pub exists: AtomicBool,
    pub fail_search: AtomicBool,
    pub fail_scan: AtomicBool,
    pub fail_index: AtomicBool,
    pub delay: Mutex<Duration>,
    pub exists_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub scan_calls: AtomicUsize,
    pub last_query: Mutex<Option<LexicalQuery>>,
}

impl Default for MockLexical {
    fn default() -> Self {
        Self {
            hits: Mutex::new(Vec::new()),
            documents: Mutex::new(Vec::new()),
            exists: AtomicBool::new(true),
            fail_search: AtomicBool::new(false),
            fail_scan: AtomicBool::new(false),
            fail_index: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
            exists_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            scan_calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }
}

impl MockLexical {
    pub fn with_hits(hits: Vec<LexicalHit>) -> Self {
        let lexical = Self::default();
        *lexical.hits.lock().unwrap() = hits;
        lexical
    }

    pub fn with_documents(documents: Vec<SnapshotDocument>) -> Self {
        let lexical = Self::default();
        *lexical.documents.lock().unwrap() = documents;
        lexical
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
            + self.search_calls.load(Ordering::SeqCst)
            + self.scan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LexicalBackend for MockLexical {
    async fn index_exists(&self) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.exists.load(Ordering::SeqCst))
    }

    async fn search(&self, query: &LexicalQuery) -> Result<Vec<LexicalHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        pause(&self.delay).await;
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(Error::backend("lexical", "search failed"));
        }
        Ok(self
            .hits
            .lock()
            .unwrap()
            .iter()
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn scan(&self, limit: usize) -> Result<Vec<SnapshotDocument>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(Error::backend("lexical", "scan failed"));
        }
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn index_documents(&self, documents: &[SnapshotDocument]) -> Result<()> {
        if self.fail_index.load(Ordering::SeqCst) {
            return Err(Error::backend("lexical", "bulk rejected"));
        }
        self.documents
            .lock()
            .unwrap()
            .extend(documents.iter().cloned());
        Ok(())
    }
}

// =============================================================================
// CACHE
// =============================================================================

#[derive(Default)]
pub struct MockCache {
    pub entries: Mutex<HashMap<String, String>>,
    pub ttls: Mutex<HashMap<String, u64>>,
    pub get_calls: AtomicUsize,
    pub set_calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl MockCache {
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl CacheBackend for MockCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Cache("connection refused".into()));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Cache("connection refused".into()));
        }
        self.put_raw(key, value);
        self.ttls.lock().unwrap().insert(key.to_string(), ttl_secs);
        Ok(())
    }
}

// =============================================================================
// WIRING
// =============================================================================

/// All mocks behind one retriever.
pub struct Harness {
    pub embedder: Arc<MockEmbedder>,
    pub vectors: Arc<MockVectorStore>,
    pub lexical: Arc<MockLexical>,
    pub cache: Arc<MockCache>,
    pub retriever: HybridRetriever,
}

impl Harness {
    pub fn new(vectors: MockVectorStore, lexical: MockLexical) -> Self {
        Self::with_config(vectors, lexical, test_config())
    }

    pub fn with_config(vectors: MockVectorStore, lexical: MockLexical, config: RetrieverConfig) -> Self {
        let embedder = Arc::new(MockEmbedder::default());
        let vectors = Arc::new(vectors);
        let lexical = Arc::new(lexical);
        let cache = Arc::new(MockCache::default());

        let retriever = HybridRetriever::new(
            embedder.clone(),
            vectors.clone(),
            Some(lexical.clone() as Arc<dyn LexicalBackend>),
            ResultCache::new(cache.clone(), CacheConfig::default()),
            config,
        )
        .expect("valid config");

        Self {
            embedder,
            vectors,
            lexical,
            cache,
            retriever,
        }
    }

    /// Backend calls made on the retrieval paths, excluding the cache.
    pub fn backend_calls(&self) -> usize {
        self.embedder.calls() + self.vectors.search_calls() + self.lexical.total_calls()
    }
}

pub fn test_config() -> RetrieverConfig {
    RetrieverConfig::default().with_backend_timeout(Duration::from_millis(200))
}

pub fn ids(results: &[ragline_search::ScoredResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}
