//! Data model shared by the retrieval engine and the backend clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::defaults;

/// Raw key/value payload as stored in a vector point or lexical document.
pub type Payload = serde_json::Map<String, JsonValue>;

/// Dense embedding vector.
pub type Embedding = Vec<f32>;

/// Reserved payload key holding the fragment text.
pub const CONTENT_KEY: &str = "content";

/// Reserved payload key holding the source document title.
pub const TITLE_KEY: &str = "title";

// =============================================================================
// RESULT SOURCE
// =============================================================================

/// Which search path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Dense vector similarity search
    Vector,
    /// Primary lexical backend
    Lexical,
    /// In-process BM25 fallback index
    Fallback,
}

impl std::fmt::Display for ResultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Lexical => write!(f, "lexical"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

impl std::str::FromStr for ResultSource {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector" => Ok(Self::Vector),
            "lexical" => Ok(Self::Lexical),
            "fallback" => Ok(Self::Fallback),
            _ => Err(format!("Invalid result source: {}", s)),
        }
    }
}

// =============================================================================
// METADATA
// =============================================================================

/// Typed metadata attached to a document fragment.
///
/// `title` is the only reserved key kept here; `content` is lifted into
/// [`ScoredResult::content`] and never appears in `extra`. Every other
/// attribute lands in `extra`, which is flattened when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl ResultMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an attribute, routing reserved keys to their typed slot.
    ///
    /// A string `title` fills [`Self::title`]; `content` is ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        let key = key.into();
        let value = value.into();
        if key == CONTENT_KEY {
            return;
        }
        if key == TITLE_KEY {
            if let JsonValue::String(title) = value {
                self.title = Some(title);
                return;
            }
        }
        self.extra.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.extra.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.extra.is_empty()
    }

    /// Split a raw backend payload into fragment content and metadata.
    pub fn from_payload(payload: Payload) -> (String, Self) {
        let mut content = String::new();
        let mut metadata = Self::default();

        for (key, value) in payload {
            if key == CONTENT_KEY {
                content = match value {
                    JsonValue::String(s) => s,
                    JsonValue::Null => String::new(),
                    other => other.to_string(),
                };
            } else {
                metadata.insert(key, value);
            }
        }

        (content, metadata)
    }

    /// Merge content and metadata back into a flat payload for storage.
    pub fn to_payload(&self, content: &str) -> Payload {
        let mut payload = Payload::new();
        payload.insert(CONTENT_KEY.to_string(), JsonValue::from(content));
        if let Some(ref title) = self.title {
            payload.insert(TITLE_KEY.to_string(), JsonValue::from(title.as_str()));
        }
        for (key, value) in &self.extra {
            payload.insert(key.clone(), value.clone());
        }
        payload
    }
}

// =============================================================================
// SCORED RESULT
// =============================================================================

/// A ranked document fragment returned by retrieval.
///
/// Identity is by `id`; the same fragment may come back from both search
/// paths and is deduplicated during fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: String,
    pub score: f64,
    pub content: String,
    #[serde(default)]
    pub metadata: ResultMetadata,
    pub source: ResultSource,
    /// Total retrieval latency, set on fused results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Search method label, set on fused results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_method: Option<String>,
}

impl ScoredResult {
    pub fn new(
        id: impl Into<String>,
        score: f64,
        content: impl Into<String>,
        source: ResultSource,
    ) -> Self {
        Self {
            id: id.into(),
            score,
            content: content.into(),
            metadata: ResultMetadata::default(),
            source,
            latency_ms: None,
            search_method: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Stamp the fused-result annotations.
    pub fn annotate(&mut self, latency_ms: u64) {
        self.latency_ms = Some(latency_ms);
        self.search_method = Some(defaults::SEARCH_METHOD.to_string());
    }
}

impl From<VectorHit> for ScoredResult {
    fn from(hit: VectorHit) -> Self {
        let (content, metadata) = ResultMetadata::from_payload(hit.payload);
        ScoredResult::new(hit.id, hit.score, content, ResultSource::Vector).with_metadata(metadata)
    }
}

impl From<LexicalHit> for ScoredResult {
    fn from(hit: LexicalHit) -> Self {
        let (content, metadata) = ResultMetadata::from_payload(hit.document);
        ScoredResult::new(hit.id, hit.score, content, ResultSource::Lexical)
            .with_metadata(metadata)
    }
}

// =============================================================================
// BACKEND TYPES
// =============================================================================

/// A nearest-neighbour hit returned by a vector store, highest score first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    /// Cosine similarity.
    pub score: f64,
    #[serde(default)]
    pub payload: Payload,
}

/// A point written to a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Embedding,
    #[serde(default)]
    pub payload: Payload,
}

/// A scored hit returned by the primary lexical backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalHit {
    pub id: String,
    pub score: f64,
    #[serde(default)]
    pub document: Payload,
}

/// Full-text query sent to the primary lexical backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalQuery {
    pub text: String,
    /// Fields to match, with optional `^boost` suffix.
    pub fields: Vec<String>,
    pub fuzziness: String,
    pub limit: usize,
}

impl LexicalQuery {
    /// Query over the default boosted fields with default fuzziness.
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            fields: defaults::LEXICAL_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            fuzziness: defaults::LEXICAL_FUZZINESS.to_string(),
            limit,
        }
    }
}

/// A document held in the lexical fallback snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: ResultMetadata,
}

impl SnapshotDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: ResultMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Build from a raw lexical document body.
    pub fn from_payload(id: impl Into<String>, payload: Payload) -> Self {
        let (content, metadata) = ResultMetadata::from_payload(payload);
        Self {
            id: id.into(),
            content,
            metadata,
        }
    }

    /// Convert into a fallback-scored result.
    pub fn to_result(&self, score: f64) -> ScoredResult {
        ScoredResult::new(
            self.id.clone(),
            score,
            self.content.clone(),
            ResultSource::Fallback,
        )
        .with_metadata(self.metadata.clone())
    }
}
