//! Hybrid retrieval combining vector similarity and lexical search.
//!
//! Both paths run concurrently and are fused with Reciprocal Rank Fusion.
//! A failing path contributes nothing; it never fails the request.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RAGLINE_RRF_K`: RRF constant (default: 60)
//! - `RAGLINE_CANDIDATE_MULTIPLIER`: Candidates requested per path, as a
//!   multiple of `top_k` (default: 2)
//! - `RAGLINE_BACKEND_TIMEOUT_MS`: Deadline for each backend call (default: 5000)
//! - `RAGLINE_FALLBACK_LIMIT`: Max documents in the fallback snapshot (default: 1000)

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use ragline_core::{
    defaults, EmbeddingBackend, Error, LexicalBackend, Result, ScoredResult, VectorStore,
};

use crate::cache::{CacheStats, ResultCache};
use crate::deadline::with_timeout;
use crate::lexical::{InitOutcome, LexicalMode, LexicalSearch};
use crate::rrf::rrf_fuse;

/// Retriever tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    /// RRF constant K.
    pub rrf_k: f64,
    /// Each path is asked for `candidate_multiplier * top_k` candidates.
    pub candidate_multiplier: usize,
    /// Deadline applied to every backend call.
    pub backend_timeout: Duration,
    /// Max documents pulled into the fallback snapshot.
    pub fallback_limit: usize,
    /// Retrievals slower than this are logged at WARN.
    pub slow_threshold: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            rrf_k: defaults::RRF_K,
            candidate_multiplier: defaults::CANDIDATE_MULTIPLIER,
            backend_timeout: Duration::from_millis(defaults::BACKEND_TIMEOUT_MS),
            fallback_limit: defaults::FALLBACK_SNAPSHOT_LIMIT,
            slow_threshold: Duration::from_millis(defaults::SLOW_RETRIEVAL_MS),
        }
    }
}

impl RetrieverConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let rrf_k = std::env::var("RAGLINE_RRF_K")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(defaults.rrf_k);

        let candidate_multiplier = std::env::var("RAGLINE_CANDIDATE_MULTIPLIER")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.candidate_multiplier);

        let backend_timeout = std::env::var("RAGLINE_BACKEND_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.backend_timeout);

        let fallback_limit = std::env::var("RAGLINE_FALLBACK_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.fallback_limit);

        Self {
            rrf_k,
            candidate_multiplier,
            backend_timeout,
            fallback_limit,
            ..defaults
        }
    }

    pub fn with_rrf_k(mut self, k: f64) -> Self {
        self.rrf_k = k;
        self
    }

    pub fn with_candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.candidate_multiplier = multiplier;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_fallback_limit(mut self, limit: usize) -> Self {
        self.fallback_limit = limit;
        self
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err(Error::Config(format!(
                "rrf_k must be a positive number, got {}",
                self.rrf_k
            )));
        }
        if self.candidate_multiplier == 0 {
            return Err(Error::Config("candidate_multiplier must be at least 1".into()));
        }
        if self.backend_timeout.is_zero() {
            return Err(Error::Config("backend_timeout must be non-zero".into()));
        }
        if self.fallback_limit == 0 {
            return Err(Error::Config("fallback_limit must be at least 1".into()));
        }
        Ok(())
    }
}

/// In-process status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub lexical_mode: LexicalMode,
    pub lexical_backend: bool,
    pub fallback_initialized: bool,
    pub fallback_documents: usize,
    pub cache_enabled: bool,
    pub cache: CacheStats,
}

/// Retrieval operations.
#[async_trait]
pub trait HybridRetrieval: Send + Sync {
    /// Return at most `top_k` fused results for `query`.
    async fn retrieve(&self, query: &str, top_k: usize, use_cache: bool)
        -> Result<Vec<ScoredResult>>;

    /// Rebuild the lexical fallback snapshot.
    async fn initialize(&self) -> Result<InitOutcome>;
}

/// Hybrid retrieval engine.
pub struct HybridRetriever {
    embedder: Arc<dyn EmbeddingBackend>,
    vector_store: Arc<dyn VectorStore>,
    lexical: LexicalSearch,
    cache: ResultCache,
    config: RetrieverConfig,
}

impl HybridRetriever {
    /// Wire up a retriever. Fails only on an invalid config.
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        vector_store: Arc<dyn VectorStore>,
        lexical: Option<Arc<dyn LexicalBackend>>,
        cache: ResultCache,
        config: RetrieverConfig,
    ) -> Result<Self> {
        config.validate()?;
        let lexical = LexicalSearch::new(lexical)
            .with_timeout(config.backend_timeout)
            .with_snapshot_limit(config.fallback_limit);
        Ok(Self {
            embedder,
            vector_store,
            lexical,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn lexical(&self) -> &LexicalSearch {
        &self.lexical
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn health(&self) -> HealthReport {
        let fallback = self.lexical.fallback();
        HealthReport {
            lexical_mode: self.lexical.mode(),
            lexical_backend: self.lexical.has_backend(),
            fallback_initialized: fallback.is_initialized(),
            fallback_documents: fallback.document_count(),
            cache_enabled: self.cache.is_enabled(),
            cache: self.cache.stats(),
        }
    }

    /// Vector path. Errors and timeouts yield an empty list.
    pub async fn vector_search(&self, query: &str, limit: usize) -> Vec<ScoredResult> {
        let start = Instant::now();
        match self.try_vector_search(query, limit).await {
            Ok(results) => {
                debug!(
                    vector_hits = results.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Vector retrieval complete"
                );
                results
            }
            Err(e) => {
                warn!(error = %e, "Vector search failed, continuing without vector results");
                Vec::new()
            }
        }
    }

    async fn try_vector_search(&self, query: &str, limit: usize) -> Result<Vec<ScoredResult>> {
        let timeout = self.config.backend_timeout;
        let embeddings =
            with_timeout(timeout, self.embedder.embed_texts(&[query.to_string()])).await?;
        let vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("no embedding returned for query".into()))?;

        let hits = with_timeout(timeout, self.vector_store.search(&vector, limit)).await?;
        let mut results: Vec<ScoredResult> = hits.into_iter().map(ScoredResult::from).collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }

    fn validate_request(query: &str, top_k: usize) -> Result<()> {
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".into()));
        }
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query must not be empty".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl HybridRetrieval for HybridRetriever {
    #[instrument(skip(self), fields(
        subsystem = "search",
        component = "hybrid_retriever",
        op = "retrieve",
    ))]
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        use_cache: bool,
    ) -> Result<Vec<ScoredResult>> {
        let start = Instant::now();
        Self::validate_request(query, top_k)?;

        let cache_key = if use_cache && self.cache.is_enabled() {
            Some(self.cache.fingerprint(query, top_k))
        } else {
            None
        };

        if let Some(key) = cache_key.as_deref() {
            if let Some(results) = self.cache.get(key).await {
                debug!(
                    cache_hit = true,
                    result_count = results.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Serving cached results"
                );
                return Ok(results);
            }
        }

        let candidates = top_k.saturating_mul(self.config.candidate_multiplier);
        let (vector, lexical) = tokio::join!(
            self.vector_search(query, candidates),
            self.lexical.search(query, candidates),
        );
        let vector_hits = vector.len();
        let lexical_hits = lexical.len();

        let fusion_start = Instant::now();
        let mut results = rrf_fuse(vec![vector, lexical], self.config.rrf_k, top_k);
        debug!(
            fusion_method = "rrf",
            rrf_k = self.config.rrf_k,
            result_count = results.len(),
            duration_ms = fusion_start.elapsed().as_millis() as u64,
            "Fusion complete"
        );

        let elapsed = start.elapsed();
        let latency_ms = elapsed.as_millis() as u64;
        for result in &mut results {
            result.annotate(latency_ms);
        }

        if let Some(key) = cache_key.as_deref() {
            self.cache.set(key, &results).await;
        }

        if elapsed > self.config.slow_threshold {
            warn!(
                slow = true,
                vector_hits,
                lexical_hits,
                lexical_mode = %self.lexical.mode(),
                duration_ms = latency_ms,
                "Slow retrieval"
            );
        }
        info!(
            vector_hits,
            lexical_hits,
            lexical_mode = %self.lexical.mode(),
            result_count = results.len(),
            duration_ms = latency_ms,
            "Hybrid retrieval completed"
        );

        Ok(results)
    }

    #[instrument(skip(self), fields(subsystem = "search", component = "hybrid_retriever", op = "initialize"))]
    async fn initialize(&self) -> Result<InitOutcome> {
        let start = Instant::now();
        match self.lexical.initialize().await {
            Ok(outcome) => {
                info!(
                    ?outcome,
                    lexical_mode = %self.lexical.mode(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Fallback initialization finished"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    fallback_documents = self.lexical.fallback().document_count(),
                    "Fallback initialization failed, keeping current snapshot"
                );
                Err(e)
            }
        }
    }
}
