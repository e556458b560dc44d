// src/launcher.rs
// Negotiates a tracking session with the launch endpoint.

use crate::error::{BridgeError, Result};
use crate::session::LaunchResponse;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Negotiates tracking sessions for (package, user) pairs.
///
/// The credential is read fresh at each call; the launcher never caches it
/// across calls, so rotation between opens is transparent.
pub struct SessionLauncher {
    client: Client,
    launch_endpoint: String,
}

impl SessionLauncher {
    pub fn new(launch_endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            launch_endpoint: launch_endpoint.into(),
        }
    }

    /// Launch or resume the session for `package_id` as the credential's user.
    ///
    /// An existing active session comes back with `resumed = true` and its
    /// saved bookmark/suspend data. Failure here is fatal to the current open
    /// attempt and must reach the user, not be swallowed.
    pub async fn launch(&self, package_id: &str, credential: &str) -> Result<LaunchResponse> {
        if credential.is_empty() {
            return Err(BridgeError::Auth);
        }
        if package_id.is_empty() {
            return Err(BridgeError::InvalidInput("package id must not be empty".into()));
        }

        let response = self
            .client
            .post(&self.launch_endpoint)
            .bearer_auth(credential)
            .json(&json!({ "packageId": package_id }))
            .send()
            .await
            .map_err(|e| BridgeError::Launch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Error bodies are JSON objects that may carry an `error` field.
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        format!("launch endpoint returned {}", status)
                    } else {
                        body
                    }
                });
            return Err(BridgeError::Launch(message));
        }

        let launch: LaunchResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Launch(format!("malformed launch response: {}", e)))?;

        info!(
            "Launched session {} for package {} (resumed: {}, read_only: {})",
            launch.session_id, package_id, launch.resumed, launch.read_only
        );
        Ok(launch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_credential_fails_before_any_request() {
        let launcher = SessionLauncher::new("http://localhost:1/sessions/launch", 1);
        let err = launcher.launch("pkg-1", "").await.unwrap_err();
        assert!(matches!(err, BridgeError::Auth));
    }

    #[tokio::test]
    async fn empty_package_id_is_invalid() {
        let launcher = SessionLauncher::new("http://localhost:1/sessions/launch", 1);
        let err = launcher.launch("", "token").await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidInput(_)));
    }
}
