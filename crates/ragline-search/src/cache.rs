//! Best-effort result cache in front of a [`CacheBackend`].
//!
//! Every failure is absorbed here: read errors and corrupt entries count as
//! misses, write errors are logged and dropped. Callers never see a cache
//! error.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RAGLINE_CACHE_TTL_SECS`: Cache TTL in seconds (default: 3600)
//! - `RAGLINE_CACHE_PREFIX`: Key prefix (default: `ragline:search:`)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use ragline_core::{defaults, CacheBackend, ScoredResult};

use crate::deadline::with_timeout;
use crate::fingerprint::fingerprint;

/// Cache settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL applied uniformly to every entry.
    pub ttl_seconds: u64,
    /// Key prefix.
    pub prefix: String,
    /// Deadline for each cache round trip.
    pub timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: defaults::CACHE_TTL_SECS,
            prefix: defaults::CACHE_KEY_PREFIX.to_string(),
            timeout: Duration::from_millis(defaults::BACKEND_TIMEOUT_MS),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let ttl_seconds = std::env::var("RAGLINE_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ttl| *ttl > 0)
            .unwrap_or(defaults::CACHE_TTL_SECS);

        let prefix = std::env::var("RAGLINE_CACHE_PREFIX")
            .unwrap_or_else(|_| defaults::CACHE_KEY_PREFIX.to_string());

        Self {
            ttl_seconds,
            prefix,
            ..Default::default()
        }
    }

    /// Set the entry TTL. Redis rejects `SET EX 0`, so 0 is clamped to 1.
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds.max(1);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub writes: u64,
}

/// Result cache keyed by query fingerprint.
pub struct ResultCache {
    backend: Option<Arc<dyn CacheBackend>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    writes: AtomicU64,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            backend: Some(backend),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Create a disabled cache: every lookup misses, nothing is written.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            config: CacheConfig::default(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Cache key for a (query, top_k) pair.
    pub fn fingerprint(&self, query: &str, top_k: usize) -> String {
        fingerprint(&self.config.prefix, query, top_k)
    }

    /// Look up fused results. Any failure is reported as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<ScoredResult>> {
        let backend = self.backend.as_ref()?;

        match with_timeout(self.config.timeout, backend.get(key)).await {
            Ok(Some(data)) => match serde_json::from_str::<Vec<ScoredResult>>(&data) {
                Ok(results) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(cache_key = key, result_count = results.len(), "Cache HIT");
                    Some(results)
                }
                Err(e) => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    warn!(cache_key = key, error = %e, "Cache entry malformed, treating as miss");
                    None
                }
            },
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key = key, "Cache MISS");
                None
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache_key = key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store fused results under `key`. Returns whether the write landed.
    pub async fn set(&self, key: &str, results: &[ScoredResult]) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        let serialized = match serde_json::to_string(results) {
            Ok(s) => s,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache_key = key, error = %e, "Cache serialization error");
                return false;
            }
        };

        match with_timeout(
            self.config.timeout,
            backend.set_with_expiry(key, &serialized, self.config.ttl_seconds),
        )
        .await
        {
            Ok(()) => {
                self.writes.fetch_add(1, Ordering::Relaxed);
                debug!(
                    cache_key = key,
                    ttl_secs = self.config.ttl_seconds,
                    "Cache SET"
                );
                true
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache_key = key, error = %e, "Cache write failed");
                false
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_seconds)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragline_core::{Error, ResultSource};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<String, (String, u64)>>,
        fail: bool,
    }

    #[async_trait]
    impl CacheBackend for MapCache {
        async fn get(&self, key: &str) -> ragline_core::Result<Option<String>> {
            if self.fail {
                return Err(Error::Cache("down".into()));
            }
            Ok(self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone()))
        }

        async fn set_with_expiry(
            &self,
            key: &str,
            value: &str,
            ttl_secs: u64,
        ) -> ragline_core::Result<()> {
            if self.fail {
                return Err(Error::Cache("down".into()));
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), ttl_secs));
            Ok(())
        }
    }

    fn sample() -> Vec<ScoredResult> {
        vec![
            ScoredResult::new("a", 0.03, "alpha", ResultSource::Vector),
            ScoredResult::new("b", 0.01, "beta", ResultSource::Lexical),
        ]
    }

    #[test]
    fn test_cache_key_prefix() {
        let cache = ResultCache::disabled();
        assert!(cache.fingerprint("test", 5).starts_with("ragline:search:"));
    }

    #[test]
    fn test_custom_prefix() {
        let cache = ResultCache::new(
            Arc::new(MapCache::default()),
            CacheConfig::default().with_prefix("tenant-a:"),
        );
        assert!(cache.fingerprint("test", 5).starts_with("tenant-a:"));
    }

    #[tokio::test]
    async fn test_disabled_cache_misses_and_skips_writes() {
        let cache = ResultCache::disabled();
        assert!(!cache.is_enabled());
        assert!(!cache.set("k", &sample()).await);
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip_with_ttl() {
        let backend = Arc::new(MapCache::default());
        let cache = ResultCache::new(backend.clone(), CacheConfig::default());

        assert!(cache.set("k", &sample()).await);
        let cached = cache.get("k").await.unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].id, "a");
        assert_eq!(cached[1].source, ResultSource::Lexical);

        let ttl = backend.entries.lock().unwrap().get("k").unwrap().1;
        assert_eq!(ttl, 3600);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.writes, 1);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_a_miss() {
        let backend = Arc::new(MapCache::default());
        backend
            .entries
            .lock()
            .unwrap()
            .insert("k".to_string(), ("{not json".to_string(), 60));
        let cache = ResultCache::new(backend, CacheConfig::default());

        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().errors, 0);
    }

    #[tokio::test]
    async fn test_backend_errors_are_swallowed() {
        let backend = Arc::new(MapCache {
            fail: true,
            ..Default::default()
        });
        let cache = ResultCache::new(backend, CacheConfig::default());

        assert!(cache.get("k").await.is_none());
        assert!(!cache.set("k", &sample()).await);
        assert_eq!(cache.stats().errors, 2);
    }

    #[tokio::test]
    async fn test_second_write_replaces_first() {
        let backend = Arc::new(MapCache::default());
        let cache = ResultCache::new(backend, CacheConfig::default());

        cache.set("k", &sample()).await;
        cache.set("k", &sample()[..1]).await;
        assert_eq!(cache.get("k").await.unwrap().len(), 1);
    }

    #[test]
    fn test_config_builders() {
        let config = CacheConfig::default()
            .with_ttl_seconds(60)
            .with_timeout(Duration::from_millis(10));
        assert_eq!(config.ttl_seconds, 60);
        assert_eq!(config.timeout, Duration::from_millis(10));
        assert_eq!(config.prefix, "ragline:search:");
    }

    #[tokio::test]
    async fn test_zero_ttl_is_clamped() {
        let config = CacheConfig::default().with_ttl_seconds(0);
        assert_eq!(config.ttl_seconds, 1);

        let backend = Arc::new(MapCache::default());
        let cache = ResultCache::new(backend.clone(), config);
        assert!(cache.set("k", &sample()).await);
        let ttl = backend.entries.lock().unwrap().get("k").unwrap().1;
        assert_eq!(ttl, 1);
    }
}
