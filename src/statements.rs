// src/statements.rs
// Fire-and-forget tracking writes to the remote store.

//! Statements are append-only facts; nothing here overwrites anything, and
//! delivery order is best-effort. Callers never await these writes: the shim's
//! driver calls must return immediately with their legacy success value no
//! matter what the network does, so every failure ends as a log line.

use crate::session::TrackingConfig;
use crate::utils::spawn_detached;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Versioned tracking-protocol header sent with every write.
const XAPI_VERSION_HEADER: &str = "X-Experience-API-Version";
const XAPI_VERSION: &str = "1.0.3";

const ACTIVITY_TYPE_LESSON: &str = "http://adlnet.gov/expapi/activities/lesson";

/// Verbs the bridge emits. The wire id follows the ADL registry convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Initialized,
    Resumed,
    Completed,
    Passed,
    Failed,
    Terminated,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Initialized => "initialized",
            Verb::Resumed => "resumed",
            Verb::Completed => "completed",
            Verb::Passed => "passed",
            Verb::Failed => "failed",
            Verb::Terminated => "terminated",
        }
    }

    pub fn id(self) -> String {
        format!("http://adlnet.gov/expapi/verbs/{}", self.as_str())
    }
}

/// Named state slots on the state-save endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateId {
    Bookmark,
    SuspendData,
}

impl StateId {
    pub fn as_str(self) -> &'static str {
        match self {
            StateId::Bookmark => "bookmark",
            StateId::SuspendData => "suspend_data",
        }
    }
}

/// One immutable tracking fact. The id is client-generated so the store can
/// deduplicate if a write is ever replayed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub id: String,
    pub actor: serde_json::Value,
    pub verb: String,
    pub activity_definition_type: String,
    pub activity_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct StateBody {
    value: String,
}

/// Sends statements and state saves to the configured remote store.
///
/// In read-only mode both paths become silent no-ops so historical viewers
/// never generate tracking traffic.
#[derive(Clone)]
pub struct StatementEmitter {
    client: Client,
    tracking: TrackingConfig,
    read_only: bool,
}

impl StatementEmitter {
    pub fn new(tracking: TrackingConfig, read_only: bool) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            tracking,
            read_only,
        }
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Emit one statement. Dispatched detached; failures are logged, never
    /// retried, and never reach the caller.
    pub fn emit(&self, verb: Verb, result: Option<serde_json::Value>) {
        if self.read_only {
            debug!("Read-only mode: suppressing '{}' statement", verb.as_str());
            return;
        }

        let statement = Statement {
            id: Uuid::new_v4().to_string(),
            actor: self.tracking.actor.clone(),
            verb: verb.id(),
            activity_definition_type: ACTIVITY_TYPE_LESSON.to_string(),
            activity_id: self.tracking.activity_id.clone(),
            timestamp: Utc::now(),
            result,
        };
        let client = self.client.clone();
        let endpoint = self.tracking.endpoint.clone();
        let auth = self.tracking.auth.clone();

        spawn_detached("statement-emit", async move {
            let response = client
                .post(&endpoint)
                .header(reqwest::header::AUTHORIZATION, auth)
                .header(XAPI_VERSION_HEADER, XAPI_VERSION)
                .json(&statement)
                .send()
                .await?;
            if !response.status().is_success() {
                anyhow::bail!("tracking write returned {}", response.status());
            }
            Ok(())
        });
    }

    /// Persist one named state value. Same fire-and-forget semantics as
    /// [`emit`](Self::emit).
    pub fn save_state(&self, state_id: StateId, value: String) {
        if self.read_only {
            debug!("Read-only mode: suppressing '{}' state save", state_id.as_str());
            return;
        }

        let client = self.client.clone();
        let endpoint = self.tracking.endpoint.clone();
        let auth = self.tracking.auth.clone();

        spawn_detached("state-save", async move {
            let response = client
                .put(&endpoint)
                .query(&[("stateId", state_id.as_str())])
                .header(reqwest::header::AUTHORIZATION, auth)
                .header(XAPI_VERSION_HEADER, XAPI_VERSION)
                .json(&StateBody { value })
                .send()
                .await?;
            if !response.status().is_success() {
                anyhow::bail!("state save returned {}", response.status());
            }
            Ok(())
        });
    }
}
