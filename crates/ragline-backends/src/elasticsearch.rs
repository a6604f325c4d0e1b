//! Elasticsearch lexical backend over the REST API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, instrument, warn};

use ragline_core::{
    defaults, Error, LexicalBackend, LexicalHit, LexicalQuery, Payload, Result, SnapshotDocument,
};

use crate::http::{build_client, ensure_success, unavailable};

const BACKEND: &str = "elasticsearch";

/// Elasticsearch connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub index: String,
    pub timeout: Duration,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: defaults::ELASTICSEARCH_URL.to_string(),
            index: defaults::LEXICAL_INDEX.to_string(),
            timeout: Duration::from_millis(defaults::BACKEND_TIMEOUT_MS),
        }
    }
}

impl ElasticsearchConfig {
    /// Reads `ELASTICSEARCH_URL` and `ELASTICSEARCH_INDEX`.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("ELASTICSEARCH_URL")
                .unwrap_or_else(|_| defaults::ELASTICSEARCH_URL.to_string()),
            index: std::env::var("ELASTICSEARCH_INDEX")
                .unwrap_or_else(|_| defaults::LEXICAL_INDEX.to_string()),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Payload,
}

#[derive(Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<JsonValue>,
}

/// Build the `multi_match` search body for a query.
fn search_body(query: &LexicalQuery) -> JsonValue {
    json!({
        "size": query.limit,
        "query": {
            "multi_match": {
                "query": query.text,
                "fields": query.fields,
                "fuzziness": query.fuzziness,
            }
        }
    })
}

/// Encode documents as a `_bulk` NDJSON body.
fn bulk_body(index: &str, documents: &[SnapshotDocument]) -> Result<String> {
    let mut body = String::new();
    for doc in documents {
        let action = json!({ "index": { "_index": index, "_id": doc.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&doc.metadata.to_payload(&doc.content))?);
        body.push('\n');
    }
    Ok(body)
}

/// First error reason reported by a `_bulk` response.
fn first_bulk_error(items: &[JsonValue]) -> Option<String> {
    items.iter().find_map(|item| {
        item.as_object()?
            .values()
            .find_map(|op| op.get("error"))
            .map(|e| e.to_string())
    })
}

/// Lexical backend backed by a single Elasticsearch index.
pub struct ElasticsearchBackend {
    client: Client,
    config: ElasticsearchConfig,
}

impl ElasticsearchBackend {
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        info!(url = %config.url, index = %config.index, "Initializing Elasticsearch backend");
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ElasticsearchConfig::from_env())
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base(), self.config.index)
    }

    async fn post_search(&self, body: &JsonValue) -> Result<Vec<Hit>> {
        let response = self
            .client
            .post(format!("{}/_search", self.index_url()))
            .json(body)
            .send()
            .await
            .map_err(unavailable(BACKEND))?;
        let response = ensure_success(BACKEND, response).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid Elasticsearch response: {}", e)))?;
        Ok(parsed.hits.hits)
    }
}

#[async_trait]
impl LexicalBackend for ElasticsearchBackend {
    async fn index_exists(&self) -> Result<bool> {
        let response = self
            .client
            .head(self.index_url())
            .send()
            .await
            .map_err(unavailable(BACKEND))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => ensure_success(BACKEND, response).await.map(|_| false),
        }
    }

    #[instrument(skip(self, query), fields(subsystem = "lexical", component = "elasticsearch", op = "search", limit = query.limit))]
    async fn search(&self, query: &LexicalQuery) -> Result<Vec<LexicalHit>> {
        let start = Instant::now();
        let hits = self.post_search(&search_body(query)).await?;

        let results: Vec<LexicalHit> = hits
            .into_iter()
            .take(query.limit)
            .map(|hit| LexicalHit {
                id: hit.id,
                score: hit.score.unwrap_or(0.0),
                document: hit.source,
            })
            .collect();

        debug!(
            lexical_hits = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Lexical search complete"
        );
        Ok(results)
    }

    #[instrument(skip(self), fields(subsystem = "lexical", component = "elasticsearch", op = "scan"))]
    async fn scan(&self, limit: usize) -> Result<Vec<SnapshotDocument>> {
        let body = json!({ "size": limit, "query": { "match_all": {} } });
        let hits = self.post_search(&body).await?;

        let documents: Vec<SnapshotDocument> = hits
            .into_iter()
            .take(limit)
            .map(|hit| SnapshotDocument::from_payload(hit.id, hit.source))
            .collect();
        debug!(document_count = documents.len(), "Snapshot scan complete");
        Ok(documents)
    }

    #[instrument(skip(self, documents), fields(subsystem = "lexical", component = "elasticsearch", op = "index_documents", input_count = documents.len()))]
    async fn index_documents(&self, documents: &[SnapshotDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(format!("{}/_bulk?refresh=wait_for", self.base()))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(&self.config.index, documents)?)
            .send()
            .await
            .map_err(unavailable(BACKEND))?;
        let response = ensure_success(BACKEND, response).await?;

        let parsed: BulkResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid bulk response: {}", e)))?;
        if parsed.errors {
            let reason = first_bulk_error(&parsed.items).unwrap_or_else(|| "unknown".into());
            warn!(error = %reason, "Bulk indexing reported item errors");
            return Err(Error::backend(BACKEND, format!("bulk indexing failed: {}", reason)));
        }

        debug!(document_count = documents.len(), "Documents indexed");
        Ok(())
    }
}
