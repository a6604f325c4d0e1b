//! Document ingestion: chunk, embed, and write to both indexes.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use ragline_core::{
    ChunkerConfig, EmbeddingBackend, Error, LexicalBackend, ParagraphChunker, ResultMetadata,
    Result, SnapshotDocument, VectorPoint, VectorStore,
};

/// A document submitted for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestDocument {
    pub content: String,
    pub title: Option<String>,
    pub file_type: String,
    pub metadata: ResultMetadata,
}

impl IngestDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
            file_type: "text".to_string(),
            metadata: ResultMetadata::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    pub fn with_metadata(mut self, metadata: ResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Outcome of a single ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Ids assigned to the stored chunks, in chunk order.
    pub chunk_ids: Vec<String>,
    /// Whether the chunks also reached the lexical backend.
    pub lexical_indexed: bool,
    /// Lexical indexing error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_error: Option<String>,
    pub duration_ms: u64,
}

impl IngestReport {
    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }
}

/// Writes documents into the vector store and the lexical backend.
pub struct Indexer {
    embedder: Arc<dyn EmbeddingBackend>,
    vector_store: Arc<dyn VectorStore>,
    lexical: Option<Arc<dyn LexicalBackend>>,
    chunker: ParagraphChunker,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        vector_store: Arc<dyn VectorStore>,
        lexical: Option<Arc<dyn LexicalBackend>>,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            lexical,
            chunker: ParagraphChunker::new(ChunkerConfig::default()),
        }
    }

    pub fn with_chunker(mut self, config: ChunkerConfig) -> Self {
        self.chunker = ParagraphChunker::new(config);
        self
    }

    /// Ingest one document.
    ///
    /// Embedding and vector writes are required; lexical indexing is
    /// best-effort and its failure is reported, not returned.
    #[instrument(skip(self, document), fields(
        subsystem = "ingest",
        component = "indexer",
        op = "ingest",
        title = document.title.as_deref().unwrap_or(""),
    ))]
    pub async fn ingest(&self, document: IngestDocument) -> Result<IngestReport> {
        let start = Instant::now();
        if document.content.trim().is_empty() {
            return Err(Error::InvalidInput("document content must not be empty".into()));
        }

        let mut base = document.metadata.clone();
        if let Some(title) = document.title.as_deref() {
            base.title = Some(title.to_string());
        }
        let chunks = self
            .chunker
            .process(&document.content, &document.file_type, &base);

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_texts(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let dimension = self.embedder.dimension();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            return Err(Error::Embedding(format!(
                "dimension mismatch: expected {}, got {}",
                dimension,
                bad.len()
            )));
        }

        self.vector_store.ensure_collection(dimension).await?;

        let mut points = Vec::with_capacity(chunks.len());
        let mut snapshot = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(embeddings) {
            let id = Uuid::new_v4().to_string();
            points.push(VectorPoint {
                id: id.clone(),
                vector,
                payload: chunk.metadata.to_payload(&chunk.content),
            });
            snapshot.push(SnapshotDocument::new(id, chunk.content).with_metadata(chunk.metadata));
        }
        let chunk_ids: Vec<String> = points.iter().map(|p| p.id.clone()).collect();

        self.vector_store.upsert(points).await?;
        debug!(chunk_count = chunk_ids.len(), "Vector points upserted");

        let (lexical_indexed, lexical_error) = match self.lexical.as_ref() {
            Some(lexical) => match lexical.index_documents(&snapshot).await {
                Ok(()) => (true, None),
                Err(e) => {
                    warn!(error = %e, "Lexical indexing failed, document is vector-only");
                    (false, Some(e.to_string()))
                }
            },
            None => (false, None),
        };

        let report = IngestReport {
            chunk_ids,
            lexical_indexed,
            lexical_error,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            chunk_count = report.chunk_count(),
            lexical_indexed,
            model = self.embedder.model_name(),
            duration_ms = report.duration_ms,
            "Document ingested"
        );
        Ok(report)
    }
}
