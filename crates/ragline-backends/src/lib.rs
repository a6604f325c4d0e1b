//! # ragline-backends
//!
//! Concrete clients for the ragline backend traits:
//! - [`OllamaEmbedder`]: embeddings via Ollama `/api/embed`
//! - [`QdrantStore`]: cosine nearest-neighbour search via the Qdrant REST API
//! - [`ElasticsearchBackend`]: boosted `multi_match` search and snapshot scans
//! - [`RedisCache`]: key/value cache with per-key expiry

mod http;

pub mod elasticsearch;
pub mod ollama;
pub mod qdrant;
pub mod redis_cache;

pub use elasticsearch::{ElasticsearchBackend, ElasticsearchConfig};
pub use ollama::{OllamaConfig, OllamaEmbedder};
pub use qdrant::{QdrantConfig, QdrantStore};
pub use redis_cache::{RedisCache, RedisConfig};
