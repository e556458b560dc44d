// src/session.rs
// Wire types shared by the launcher, poller, and tracking components.

use serde::{Deserialize, Serialize};

/// Server-side status of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Terminated,
}

impl SessionStatus {
    /// Completion from the bridge's perspective: the session is over, whether
    /// the content finished cleanly or was cut short.
    pub fn is_finished(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Terminated)
    }
}

/// Remote-store coordinates handed back by the launch endpoint. The actor is
/// opaque server-issued JSON and is passed through to statements untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub endpoint: String,
    pub auth: String,
    pub actor: serde_json::Value,
    #[serde(rename = "activityId")]
    pub activity_id: String,
}

/// Response from the session launch endpoint. A prior active session for the
/// same (user, package) pair comes back with `resumed = true` and its saved
/// state; otherwise the server issues a fresh session with empty state.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub resumed: bool,
    #[serde(default)]
    pub bookmark: String,
    #[serde(rename = "suspendData", default)]
    pub suspend_data: String,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
    #[serde(rename = "trackingConfig")]
    pub tracking_config: TrackingConfig,
}

/// Minimal body of a session-status read.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: SessionStatus,
}
