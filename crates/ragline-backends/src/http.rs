//! Shared reqwest helpers.

use std::time::Duration;

use reqwest::{Client, Response};

use ragline_core::{Error, Result};

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Map transport errors onto [`Error::BackendUnavailable`].
pub(crate) fn unavailable(backend: &'static str) -> impl Fn(reqwest::Error) -> Error {
    move |e| Error::backend(backend, format!("Request failed: {}", e))
}

/// Pass a 2xx response through; anything else becomes an error carrying the
/// status and body.
pub(crate) async fn ensure_success(backend: &'static str, response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::backend(
        backend,
        format!("{} returned {}: {}", backend, status, body),
    ))
}
