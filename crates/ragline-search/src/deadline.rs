//! Bounded backend calls.

use std::future::Future;
use std::time::Duration;

use ragline_core::{Error, Result};

/// Run a backend call under a deadline; expiry becomes [`Error::Timeout`].
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(limit.as_millis() as u64)),
    }
}
