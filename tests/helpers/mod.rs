// tests/helpers/mod.rs
// In-process mock of the remote endpoints: content proxy, session launch,
// tracking store, and session status.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MOCK_SESSION_ID: &str = "mock-session-1";
pub const PACKAGE_BODY: &[u8] = b"<html><body>lesson</body></html>";

#[derive(Default)]
pub struct MockState {
    // Launch response shape
    pub resumed: bool,
    pub read_only: bool,
    pub bookmark: String,
    pub suspend_data: String,
    // Failure injection
    pub launch_error: Option<(u16, String)>,
    pub proxy_error: Option<(u16, String)>,
    pub launch_delay_ms: u64,
    // Polled status
    pub session_status: String,
    // Observations
    pub proxy_hits: usize,
    pub proxy_queries: Vec<HashMap<String, String>>,
    pub launch_hits: usize,
    pub launch_auth: Option<String>,
    pub statements: Vec<serde_json::Value>,
    pub statement_headers: Vec<(Option<String>, Option<String>)>,
    pub state_saves: Vec<(String, String)>,

    base_url: String,
}

impl MockState {
    /// Statements recorded so far whose verb id ends with `verb`.
    pub fn statements_with_verb(&self, verb: &str) -> usize {
        self.statements
            .iter()
            .filter(|s| {
                s.get("verb")
                    .and_then(|v| v.as_str())
                    .is_some_and(|v| v.ends_with(verb))
            })
            .count()
    }
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockBackend {
    pub state: Shared,
    pub base_url: String,
}

impl MockBackend {
    pub fn proxy_endpoint(&self) -> String {
        format!("{}/content-proxy", self.base_url)
    }

    pub fn launch_endpoint(&self) -> String {
        format!("{}/sessions/launch", self.base_url)
    }

    pub fn status_endpoint(&self) -> String {
        format!("{}/sessions", self.base_url)
    }
}

pub async fn spawn_mock_backend() -> MockBackend {
    let state: Shared = Arc::new(Mutex::new(MockState {
        session_status: "active".to_string(),
        ..MockState::default()
    }));

    let app = Router::new()
        .route("/content-proxy", get(proxy_handler))
        .route("/sessions/launch", post(launch_handler))
        .route("/sessions/{id}/status", get(status_handler))
        .route("/xapi", post(statement_handler).put(state_save_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    state.lock().unwrap().base_url = base_url.clone();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { state, base_url }
}

async fn proxy_handler(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let error = {
        let mut s = state.lock().unwrap();
        s.proxy_hits += 1;
        s.proxy_queries.push(params);
        s.proxy_error.clone()
    };
    match error {
        Some((code, body)) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response(),
        None => PACKAGE_BODY.to_vec().into_response(),
    }
}

async fn launch_handler(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let (delay_ms, error, body) = {
        let mut s = state.lock().unwrap();
        s.launch_hits += 1;
        s.launch_auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = json!({
            "sessionId": MOCK_SESSION_ID,
            "resumed": s.resumed,
            "bookmark": s.bookmark,
            "suspendData": s.suspend_data,
            "readOnly": s.read_only,
            "trackingConfig": {
                "endpoint": format!("{}/xapi", s.base_url),
                "auth": "Basic bW9jay1hdXRo",
                "actor": {"name": "learner", "mbox": "mailto:learner@example.com"},
                "activityId": "http://example.com/activities/pkg-1",
            },
        });
        (s.launch_delay_ms, s.launch_error.clone(), body)
    };

    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    match error {
        Some((code, message)) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({ "error": message })),
        )
            .into_response(),
        None => Json(body).into_response(),
    }
}

async fn status_handler(State(state): State<Shared>, Path(_id): Path<String>) -> Response {
    let status = state.lock().unwrap().session_status.clone();
    Json(json!({ "status": status })).into_response()
}

async fn statement_handler(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let mut s = state.lock().unwrap();
    s.statement_headers.push((
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        headers
            .get("x-experience-api-version")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    ));
    s.statements.push(body);
    StatusCode::NO_CONTENT
}

async fn state_save_handler(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let state_id = params.get("stateId").cloned().unwrap_or_default();
    let value = body
        .get("value")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    state.lock().unwrap().state_saves.push((state_id, value));
    StatusCode::NO_CONTENT
}
