// src/fetcher.rs
// Retrieves package content through the content proxy.

//! The proxy streams raw document bytes for a path inside a package, so the
//! bridge never lets embedded content make a cross-origin call of its own.
//! Non-HTML responses come back untouched; the proxy applies no content-type
//! rewriting on this path.

use crate::error::{BridgeError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches package entry documents and wraps them as releasable render
/// sources.
pub struct ContentFetcher {
    client: Client,
    proxy_endpoint: String,
}

impl ContentFetcher {
    pub fn new(proxy_endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            proxy_endpoint: proxy_endpoint.into(),
        }
    }

    /// Fetch one document from inside a package.
    ///
    /// Errors are terminal for the current load attempt; the caller surfaces
    /// the message and does not retry.
    pub async fn fetch_package(
        &self,
        package_id: &str,
        path: &str,
        token: &str,
    ) -> Result<RenderSource> {
        if package_id.is_empty() {
            return Err(BridgeError::InvalidInput("package id must not be empty".into()));
        }
        if path.is_empty() {
            return Err(BridgeError::InvalidInput("package path must not be empty".into()));
        }

        let response = self
            .client
            .get(&self.proxy_endpoint)
            .query(&[("packageId", package_id), ("path", path), ("token", token)])
            .send()
            .await
            .map_err(|e| BridgeError::Load(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                format!("content proxy returned {}", status)
            } else {
                body
            };
            return Err(BridgeError::Load(message));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BridgeError::Load(e.to_string()))?;

        debug!("Fetched {} bytes for package {} path {}", bytes.len(), package_id, path);
        Ok(RenderSource::new(bytes.to_vec()))
    }
}

/// A transient, locally-owned buffer holding a fetched entry document.
///
/// Owned by exactly one controller instance. The owner must call [`release`]
/// on every exit path (reload, unmount, mode switch); `Drop` releases as a
/// backstop so repeated opens cannot accumulate buffers.
///
/// [`release`]: RenderSource::release
#[derive(Debug)]
pub struct RenderSource {
    bytes: Option<Vec<u8>>,
}

impl RenderSource {
    fn new(bytes: Vec<u8>) -> Self {
        Self { bytes: Some(bytes) }
    }

    /// The document bytes, or `None` once released.
    pub fn body(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    pub fn is_released(&self) -> bool {
        self.bytes.is_none()
    }

    /// Release the buffer. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(bytes) = self.bytes.take() {
            debug!("Released render source ({} bytes)", bytes.len());
        }
    }
}

impl Drop for RenderSource {
    fn drop(&mut self) {
        self.release();
    }
}
