// src/utils.rs
// Shared helpers for the bridge.

use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// Host-side completion hook shared by the shim and the poller.
pub type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

/// Spawn a fire-and-forget task.
///
/// Tracking writes must never block or fail the caller, so the future runs
/// detached and a rejection is logged instead of propagated. `name` identifies
/// the task in diagnostics.
pub fn spawn_detached<F>(name: &'static str, fut: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            warn!("Detached task '{}' failed: {:#}", name, e);
        }
    });
}

/// Legacy driver-API boolean. Third-party packages expect the strings
/// `"true"`/`"false"` rather than JSON booleans, so the conversion lives here
/// and internal logic keeps using `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyBool(pub bool);

impl LegacyBool {
    pub const TRUE: &'static str = "true";
    pub const FALSE: &'static str = "false";

    pub fn as_str(self) -> &'static str {
        if self.0 { Self::TRUE } else { Self::FALSE }
    }
}

impl From<bool> for LegacyBool {
    fn from(value: bool) -> Self {
        LegacyBool(value)
    }
}

impl std::fmt::Display for LegacyBool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
