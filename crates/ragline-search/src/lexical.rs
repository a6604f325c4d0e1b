//! Lexical search path: primary backend with an in-process BM25 fallback.
//!
//! The path starts in [`LexicalMode::Primary`]. The first backend error,
//! timeout, or missing index moves it to [`LexicalMode::Fallback`] for the
//! rest of the process. Only [`LexicalSearch::initialize`] moves it back, and
//! only after confirming the primary index exists.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use ragline_core::{defaults, Error, LexicalBackend, LexicalQuery, Result, ScoredResult};

use crate::deadline::with_timeout;
use crate::fallback::FallbackIndex;

/// Which engine currently serves lexical queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LexicalMode {
    Primary = 0,
    Fallback = 1,
}

impl LexicalMode {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LexicalMode::Primary,
            _ => LexicalMode::Fallback,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LexicalMode::Primary => "primary",
            LexicalMode::Fallback => "fallback",
        }
    }
}

impl fmt::Display for LexicalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a fallback rebuild did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InitOutcome {
    /// A new snapshot was installed.
    Loaded { documents: usize },
    /// The primary index does not exist; nothing changed.
    IndexMissing,
    /// The primary index had no usable documents; nothing changed.
    Empty,
    /// No lexical backend is configured.
    NoBackend,
}

/// Lexical search with graceful degradation.
pub struct LexicalSearch {
    backend: Option<Arc<dyn LexicalBackend>>,
    fallback: FallbackIndex,
    mode: AtomicU8,
    timeout: Duration,
    snapshot_limit: usize,
}

impl LexicalSearch {
    /// Without a backend the path serves from the fallback index only.
    pub fn new(backend: Option<Arc<dyn LexicalBackend>>) -> Self {
        let mode = if backend.is_some() {
            LexicalMode::Primary
        } else {
            LexicalMode::Fallback
        };
        Self {
            backend,
            fallback: FallbackIndex::new(),
            mode: AtomicU8::new(mode as u8),
            timeout: Duration::from_millis(defaults::BACKEND_TIMEOUT_MS),
            snapshot_limit: defaults::FALLBACK_SNAPSHOT_LIMIT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_snapshot_limit(mut self, limit: usize) -> Self {
        self.snapshot_limit = limit;
        self
    }

    pub fn mode(&self) -> LexicalMode {
        LexicalMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn fallback(&self) -> &FallbackIndex {
        &self.fallback
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Search for up to `limit` lexical matches. Never fails: backend
    /// problems switch to the fallback index.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<ScoredResult> {
        if let (LexicalMode::Primary, Some(backend)) = (self.mode(), self.backend.as_ref()) {
            match self.primary_search(backend.as_ref(), query, limit).await {
                Ok(results) => return results,
                Err(e) => self.enter_fallback(&e),
            }
        }
        self.fallback.search(query, limit)
    }

    async fn primary_search(
        &self,
        backend: &dyn LexicalBackend,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredResult>> {
        if !with_timeout(self.timeout, backend.index_exists()).await? {
            return Err(Error::IndexNotFound("lexical index does not exist".into()));
        }

        let request = LexicalQuery::new(query, limit);
        let hits = with_timeout(self.timeout, backend.search(&request)).await?;
        let mut results: Vec<ScoredResult> = hits.into_iter().map(ScoredResult::from).collect();
        results.truncate(limit);

        debug!(lexical_hits = results.len(), "Primary lexical search complete");
        Ok(results)
    }

    fn enter_fallback(&self, cause: &Error) {
        let switched = self
            .mode
            .compare_exchange(
                LexicalMode::Primary as u8,
                LexicalMode::Fallback as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if switched {
            warn!(
                error = %cause,
                lexical_mode = %LexicalMode::Fallback,
                fallback_documents = self.fallback.document_count(),
                "Lexical backend unavailable, switching to fallback index"
            );
        } else {
            debug!(error = %cause, "Lexical backend failed while already in fallback");
        }
    }

    fn restore_primary(&self) {
        let previous = self.mode.swap(LexicalMode::Primary as u8, Ordering::AcqRel);
        if LexicalMode::from_u8(previous) == LexicalMode::Fallback {
            info!(lexical_mode = %LexicalMode::Primary, "Lexical backend restored");
        }
    }

    /// Rebuild the fallback snapshot from the primary backend.
    ///
    /// Idempotent. When the primary index exists the mode is reset to
    /// [`LexicalMode::Primary`]. On any failure the current snapshot and mode
    /// are left untouched.
    #[instrument(skip(self), fields(subsystem = "search", component = "lexical", op = "initialize"))]
    pub async fn initialize(&self) -> Result<InitOutcome> {
        let Some(backend) = self.backend.as_ref() else {
            debug!("No lexical backend configured, fallback initialization skipped");
            return Ok(InitOutcome::NoBackend);
        };

        let exists = with_timeout(self.timeout, backend.index_exists())
            .await
            .map_err(|e| Error::Initialization(format!("index check failed: {}", e)))?;
        if !exists {
            info!("Lexical index does not exist, fallback left unchanged");
            return Ok(InitOutcome::IndexMissing);
        }

        let documents = with_timeout(self.timeout, backend.scan(self.snapshot_limit))
            .await
            .map_err(|e| Error::Initialization(format!("snapshot scan failed: {}", e)))?;

        // Leave fallback only once both the index check and the scan succeeded.
        self.restore_primary();

        if documents.iter().all(|doc| doc.content.trim().is_empty()) {
            info!(
                scanned = documents.len(),
                "Lexical index has no usable documents, fallback left unchanged"
            );
            return Ok(InitOutcome::Empty);
        }

        let count = self.fallback.replace(documents);
        Ok(InitOutcome::Loaded { documents: count })
    }
}
