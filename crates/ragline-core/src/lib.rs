//! # ragline-core
//!
//! Core types, traits, and abstractions for the ragline retrieval engine.
//!
//! This crate provides the foundational data structures and the backend
//! trait definitions that the search engine and the concrete backend
//! clients depend on.

pub mod chunking;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use chunking::{Chunk, ChunkerConfig, ParagraphChunker, SemanticTag};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
