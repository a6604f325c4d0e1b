//! Redis cache backend.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_ENABLED`: Set to "false" to disable caching (default: true)
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, warn};

use ragline_core::{defaults, CacheBackend, Error, Result};

/// Redis connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    /// Deadline for the initial connection.
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: defaults::REDIS_URL.to_string(),
            connect_timeout: Duration::from_millis(defaults::BACKEND_TIMEOUT_MS),
        }
    }
}

impl RedisConfig {
    pub fn from_env() -> Self {
        let enabled = std::env::var("REDIS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| defaults::REDIS_URL.to_string());

        Self {
            enabled,
            url,
            ..Default::default()
        }
    }
}

/// Redis-backed [`CacheBackend`].
///
/// A cache that failed to connect stays usable: every operation returns
/// [`Error::Cache`], which the result cache treats as a miss.
#[derive(Clone)]
pub struct RedisCache {
    connection: Option<ConnectionManager>,
}

impl RedisCache {
    /// Connect using `config`. Never fails; connection problems are logged and
    /// produce a disconnected cache.
    pub async fn connect(config: &RedisConfig) -> Self {
        if !config.enabled {
            info!("Redis cache disabled via REDIS_ENABLED=false");
            return Self::disconnected();
        }

        let client = match redis::Client::open(config.url.as_str()) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Invalid Redis URL, cache disabled");
                return Self::disconnected();
            }
        };

        match tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client)).await {
            Ok(Ok(connection)) => {
                info!(
                    url = %config.url.replace(|c: char| c.is_ascii_alphanumeric(), "*"),
                    "Redis cache connected"
                );
                Self {
                    connection: Some(connection),
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to connect to Redis, cache disabled");
                Self::disconnected()
            }
            Err(_) => {
                warn!(
                    timeout_ms = config.connect_timeout.as_millis() as u64,
                    "Redis connection timed out, cache disabled"
                );
                Self::disconnected()
            }
        }
    }

    pub async fn from_env() -> Self {
        Self::connect(&RedisConfig::from_env()).await
    }

    pub fn disconnected() -> Self {
        Self { connection: None }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&self) -> Result<ConnectionManager> {
        self.connection
            .clone()
            .ok_or_else(|| Error::Cache("Redis not connected".into()))
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection()?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| Error::Cache(format!("Redis GET error: {}", e)))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection()?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| Error::Cache(format!("Redis SET error: {}", e)))
    }
}
