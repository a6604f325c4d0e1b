//! Paragraph chunking for ingestion.
//!
//! Text is split at blank lines, paragraphs are packed greedily into chunks
//! of at most `chunk_size` characters, and every chunk after the first is
//! prefixed with the last `chunk_overlap` characters of its predecessor.
//!
//! ```rust
//! use ragline_core::chunking::{ChunkerConfig, ParagraphChunker};
//!
//! let chunker = ParagraphChunker::new(ChunkerConfig::default());
//! let chunks = chunker.split("First paragraph.\n\nSecond paragraph.");
//! assert_eq!(chunks.len(), 1);
//! ```

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::defaults;
use crate::models::ResultMetadata;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n\s*\r?\n").expect("paragraph regex is valid"));

static NUMBERED_STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.\s").expect("step regex is valid"));

/// Configuration for paragraph chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk before overlap is prepended.
    pub chunk_size: usize,
    /// Characters copied from the end of the previous chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::CHUNK_SIZE,
            chunk_overlap: defaults::CHUNK_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

/// Coarse content classification stored with each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticTag {
    Code,
    Procedure,
    Warning,
    Data,
    General,
}

impl SemanticTag {
    /// Classify a chunk by simple textual markers. First match wins.
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if text.contains("```")
            || text.contains("代码")
            || lower.contains("function")
            || lower.contains("class ")
        {
            Self::Code
        } else if NUMBERED_STEP.is_match(text) || text.contains("步骤") || text.contains("操作")
        {
            Self::Procedure
        } else if text.contains('!')
            || text.contains("注意")
            || text.contains("警告")
            || lower.contains("warning")
        {
            Self::Warning
        } else if text.contains('|') || text.contains("表格") || text.contains("数据") {
            Self::Data
        } else {
            Self::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Procedure => "procedure",
            Self::Warning => "warning",
            Self::Data => "data",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for SemanticTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chunk ready for embedding and indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
    pub metadata: ResultMetadata,
}

/// Splits text at paragraph boundaries and applies fixed character overlap.
#[derive(Debug, Clone, Default)]
pub struct ParagraphChunker {
    config: ChunkerConfig,
}

impl ParagraphChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split text into overlapped chunk strings.
    pub fn split(&self, text: &str) -> Vec<String> {
        let packed = self.pack_paragraphs(text);
        if self.config.chunk_overlap == 0 || packed.len() < 2 {
            return packed;
        }

        let mut chunks = Vec::with_capacity(packed.len());
        chunks.push(packed[0].clone());
        for pair in packed.windows(2) {
            let mut chunk = tail_chars(&pair[0], self.config.chunk_overlap).to_string();
            chunk.push_str(&pair[1]);
            chunks.push(chunk);
        }
        chunks
    }

    /// Split, then attach per-chunk metadata on top of `base`.
    ///
    /// Adds `file_type`, `processed_at`, `chunk_index`, `semantic_tag` and
    /// `content_hash` (md5 hex of the chunk text).
    pub fn process(&self, content: &str, file_type: &str, base: &ResultMetadata) -> Vec<Chunk> {
        let processed_at = Utc::now().to_rfc3339();
        let chunks: Vec<Chunk> = self
            .split(content)
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let mut metadata = base.clone();
                metadata.insert("file_type", file_type);
                metadata.insert("processed_at", processed_at.as_str());
                metadata.insert("chunk_index", JsonValue::from(index));
                metadata.insert("semantic_tag", SemanticTag::detect(&text).as_str());
                metadata.insert("content_hash", format!("{:x}", md5::compute(&text)));
                Chunk {
                    index,
                    content: text,
                    metadata,
                }
            })
            .collect();

        debug!(
            chunk_count = chunks.len(),
            chunk_size = self.config.chunk_size,
            chunk_overlap = self.config.chunk_overlap,
            "Document chunked"
        );
        chunks
    }

    /// Greedy paragraph packing without overlap.
    fn pack_paragraphs(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for para in PARAGRAPH_BREAK.split(text) {
            let para = para.trim();
            if para.is_empty() {
                continue;
            }
            let para_len = para.chars().count();
            // Paragraphs are joined with a blank line ("\n\n", 2 chars).
            let joined_len = if current.is_empty() {
                para_len
            } else {
                current_len + 2 + para_len
            };

            if current.is_empty() || joined_len <= self.config.chunk_size {
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(para);
                current_len = joined_len;
            } else {
                chunks.push(std::mem::take(&mut current));
                current.push_str(para);
                current_len = para_len;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

/// Last `n` characters of `s` (the whole string when shorter).
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    match s.char_indices().nth(skip) {
        Some((offset, _)) => &s[offset..],
        None => s,
    }
}
