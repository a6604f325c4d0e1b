//! Centralized default constants for ragline.
//!
//! **This module is the single source of truth** for shared default values.
//! Config structs and backend clients reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// FUSION
// =============================================================================

/// Reciprocal Rank Fusion constant. Each list contributes `1 / (RRF_K + rank)`
/// with a 0-based rank.
pub const RRF_K: f64 = 60.0;

/// Each search path is asked for `CANDIDATE_MULTIPLIER * top_k` candidates so
/// fusion has enough material to re-rank.
pub const CANDIDATE_MULTIPLIER: usize = 2;

/// Label attached to every fused result.
pub const SEARCH_METHOD: &str = "hybrid";

// =============================================================================
// CACHE
// =============================================================================

/// Result cache TTL in seconds (1 hour).
pub const CACHE_TTL_SECS: u64 = 3600;

/// Prefix for all result cache keys.
pub const CACHE_KEY_PREFIX: &str = "ragline:search:";

/// Number of hex characters of the SHA-256 digest kept in a cache key.
pub const CACHE_KEY_HASH_LEN: usize = 32;

/// Default Redis connection URL.
pub const REDIS_URL: &str = "redis://localhost:6379";

// =============================================================================
// LEXICAL
// =============================================================================

/// Maximum number of documents pulled from the lexical backend when building
/// the fallback snapshot.
pub const FALLBACK_SNAPSHOT_LIMIT: usize = 1000;

/// BM25 term frequency saturation.
pub const BM25_K1: f64 = 1.5;

/// BM25 document length normalization.
pub const BM25_B: f64 = 0.75;

/// Boosted fields queried on the primary lexical backend.
pub const LEXICAL_FIELDS: &[&str] = &["content^3", "title^2", "metadata.*"];

/// Fuzziness passed to the primary lexical backend.
pub const LEXICAL_FUZZINESS: &str = "AUTO";

/// Default Elasticsearch endpoint.
pub const ELASTICSEARCH_URL: &str = "http://localhost:9200";

/// Default lexical index name.
pub const LEXICAL_INDEX: &str = "docs";

// =============================================================================
// VECTOR
// =============================================================================

/// Default Qdrant endpoint.
pub const QDRANT_URL: &str = "http://localhost:6333";

/// Default vector collection name.
pub const VECTOR_COLLECTION: &str = "docs";

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

/// Timeout for embedding requests (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Deadline applied to each backend call made during retrieval.
pub const BACKEND_TIMEOUT_MS: u64 = 5000;

/// Threshold above which a retrieval is logged as slow.
pub const SLOW_RETRIEVAL_MS: u64 = 2000;

/// Interval between background fallback refreshes.
pub const REFRESH_INTERVAL_SECS: u64 = 300;

/// Capacity of the refresh event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 64;

// =============================================================================
// CHUNKING
// =============================================================================

/// Maximum characters per chunk before overlap is applied.
pub const CHUNK_SIZE: usize = 1000;

/// Characters carried over from the previous chunk.
pub const CHUNK_OVERLAP: usize = 200;
