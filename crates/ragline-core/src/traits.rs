//! Core traits for ragline backends.
//!
//! The retrieval engine only talks to these interfaces. Concrete clients
//! live in `ragline-backends`; tests substitute in-memory implementations.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Embedding, LexicalHit, LexicalQuery, SnapshotDocument, VectorHit, VectorPoint};

// =============================================================================
// EMBEDDING
// =============================================================================

/// Backend for generating embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns one embedding vector per input text, in input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// VECTOR STORE
// =============================================================================

/// Nearest-neighbour index over embeddings (cosine distance).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist yet.
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Insert or replace points by id.
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()>;

    /// Return up to `limit` hits ordered by descending cosine similarity.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>>;
}

// =============================================================================
// LEXICAL BACKEND
// =============================================================================

/// External full-text search engine.
#[async_trait]
pub trait LexicalBackend: Send + Sync {
    /// Whether the configured index exists.
    async fn index_exists(&self) -> Result<bool>;

    /// Run a scored full-text query, best match first.
    async fn search(&self, query: &LexicalQuery) -> Result<Vec<LexicalHit>>;

    /// Pull up to `limit` documents for building the fallback snapshot.
    async fn scan(&self, limit: usize) -> Result<Vec<SnapshotDocument>>;

    /// Index documents, replacing any with the same id.
    async fn index_documents(&self, documents: &[SnapshotDocument]) -> Result<()>;
}

// =============================================================================
// CACHE BACKEND
// =============================================================================

/// Key-value store with per-key expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a value; `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value that expires after `ttl_secs`, replacing any prior value.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
}
