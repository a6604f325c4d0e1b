//! Qdrant vector store over the REST API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, instrument};

use ragline_core::{defaults, Error, Payload, Result, VectorHit, VectorPoint, VectorStore};

use crate::http::{build_client, ensure_success, unavailable};

const BACKEND: &str = "qdrant";

/// Qdrant connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub timeout: Duration,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: defaults::QDRANT_URL.to_string(),
            collection: defaults::VECTOR_COLLECTION.to_string(),
            timeout: Duration::from_millis(defaults::BACKEND_TIMEOUT_MS),
        }
    }
}

impl QdrantConfig {
    /// Reads `QDRANT_URL` and `QDRANT_COLLECTION`.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("QDRANT_URL").unwrap_or_else(|_| defaults::QDRANT_URL.to_string()),
            collection: std::env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| defaults::VECTOR_COLLECTION.to_string()),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: JsonValue,
    score: f64,
    #[serde(default)]
    payload: Option<Payload>,
}

/// Qdrant ids are either unsigned integers or UUID strings.
fn point_id(id: JsonValue) -> String {
    match id {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

/// Vector store backed by a single Qdrant collection (cosine distance).
pub struct QdrantStore {
    client: Client,
    config: QdrantConfig,
}

impl QdrantStore {
    pub fn new(config: QdrantConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        info!(url = %config.url, collection = %config.collection, "Initializing Qdrant store");
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(QdrantConfig::from_env())
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/collections/{}",
            self.config.url.trim_end_matches('/'),
            self.config.collection
        )
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    #[instrument(skip(self), fields(subsystem = "vector", component = "qdrant", op = "ensure_collection", collection = %self.config.collection))]
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(unavailable(BACKEND))?;

        if response.status().is_success() {
            debug!("Collection already exists");
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            ensure_success(BACKEND, response).await?;
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        let response = self
            .client
            .put(self.collection_url())
            .json(&body)
            .send()
            .await
            .map_err(unavailable(BACKEND))?;
        ensure_success(BACKEND, response).await?;

        info!(dimension, "Created vector collection");
        Ok(())
    }

    #[instrument(skip(self, points), fields(subsystem = "vector", component = "qdrant", op = "upsert", input_count = points.len()))]
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let start = Instant::now();
        let count = points.len();

        let body = json!({
            "points": points
                .into_iter()
                .map(|p| json!({ "id": p.id, "vector": p.vector, "payload": p.payload }))
                .collect::<Vec<_>>()
        });
        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&body)
            .send()
            .await
            .map_err(unavailable(BACKEND))?;
        ensure_success(BACKEND, response).await?;

        debug!(
            result_count = count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Points upserted"
        );
        Ok(())
    }

    #[instrument(skip(self, vector), fields(subsystem = "vector", component = "qdrant", op = "search"))]
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
        let start = Instant::now();
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&body)
            .send()
            .await
            .map_err(unavailable(BACKEND))?;
        let response = ensure_success(BACKEND, response).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid Qdrant response: {}", e)))?;

        let mut hits: Vec<VectorHit> = parsed
            .result
            .into_iter()
            .map(|p| VectorHit {
                id: point_id(p.id),
                score: p.score,
                payload: p.payload.unwrap_or_default(),
            })
            .collect();
        hits.truncate(limit);

        debug!(
            vector_hits = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Vector search complete"
        );
        Ok(hits)
    }
}
