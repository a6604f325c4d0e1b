//! # ragline-search
//!
//! Hybrid retrieval engine (vector + lexical + RRF) for ragline.
//!
//! This crate provides:
//! - Concurrent vector and lexical retrieval fused with Reciprocal Rank Fusion
//! - A BM25 fallback index used when the lexical backend is unavailable
//! - A best-effort result cache keyed by query fingerprint
//! - Periodic background refresh of the fallback snapshot
//! - Document ingestion into both indexes
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ragline_search::{HybridRetrieval, HybridRetriever, ResultCache, RetrieverConfig};
//!
//! let retriever = HybridRetriever::new(
//!     Arc::new(embedder),
//!     Arc::new(vector_store),
//!     Some(Arc::new(lexical_backend)),
//!     ResultCache::new(Arc::new(redis), Default::default()),
//!     RetrieverConfig::from_env(),
//! )?;
//! retriever.initialize().await?;
//!
//! let results = retriever.retrieve("how do I rotate keys", 5, true).await?;
//! ```

pub mod bm25;
pub mod cache;
mod deadline;
pub mod fallback;
pub mod fingerprint;
pub mod hybrid;
pub mod ingest;
pub mod lexical;
pub mod refresh;
pub mod rrf;

// Re-export core types
pub use ragline_core::*;

pub use bm25::{tokenize, Bm25Index};
pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use fallback::{Bm25Snapshot, FallbackIndex};
pub use fingerprint::{fingerprint, normalize_query};
pub use hybrid::{HealthReport, HybridRetrieval, HybridRetriever, RetrieverConfig};
pub use ingest::{IngestDocument, IngestReport, Indexer};
pub use lexical::{InitOutcome, LexicalMode, LexicalSearch};
pub use refresh::{spawn_refresh, RefreshEvent, RefreshHandle};
pub use rrf::{rrf_fuse, rrf_score, RRF_K};
