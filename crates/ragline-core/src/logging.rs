//! Structured logging schema and field name constants for ragline.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by the same field names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (initialize, refresh), retrieval completions |
//! | DEBUG | Decision points, cache hits/misses, per-path counts |
//! | TRACE | Per-item iteration, high-volume data (fused hits, chunks) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "search", "cache", "backend", "ingest", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "hybrid_retriever", "rrf_fusion", "fallback_index", "qdrant"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "retrieve", "initialize", "embed_texts", "scan"
pub const OPERATION: &str = "op";

/// Search query text.
pub const QUERY: &str = "query";

/// Requested number of results.
pub const TOP_K: &str = "top_k";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of chunks produced during ingestion.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of input texts sent to an embedding model.
pub const INPUT_COUNT: &str = "input_count";

/// Number of documents loaded into the fallback snapshot.
pub const DOCUMENT_COUNT: &str = "document_count";

// ─── Search-specific fields ────────────────────────────────────────────────

/// Number of vector results before fusion.
pub const VECTOR_HITS: &str = "vector_hits";

/// Number of lexical (primary or fallback) results before fusion.
pub const LEXICAL_HITS: &str = "lexical_hits";

/// Fusion method used ("rrf").
pub const FUSION_METHOD: &str = "fusion_method";

/// RRF k parameter.
pub const RRF_K: &str = "rrf_k";

/// Lexical path state ("primary", "fallback").
pub const LEXICAL_MODE: &str = "lexical_mode";

/// Whether a lookup was served from the result cache.
pub const CACHE_HIT: &str = "cache_hit";

/// Cache key (fingerprint) used for a lookup or write.
pub const CACHE_KEY: &str = "cache_key";

// ─── Backend fields ────────────────────────────────────────────────────────

/// Backend name ("ollama", "qdrant", "elasticsearch", "redis").
pub const BACKEND: &str = "backend";

/// Model name used for embedding.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
