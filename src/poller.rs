// src/poller.rs
// Out-of-band completion detection by periodic session-status reads.

//! Content can finish through paths the shim never sees (state written by the
//! package and evaluated by a separate process), so the controller also
//! samples session status on a fixed interval. A transient read failure is
//! swallowed and the next tick tries again; only cancellation or an observed
//! finish stops the loop.

use crate::session::StatusResponse;
use crate::utils::CompletionCallback;
use reqwest::Client;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct CompletionPoller {
    client: Client,
    status_endpoint: String,
    interval: Duration,
}

/// Handle to a running poll loop. Stopping is idempotent; after `stop()` the
/// completion callback can no longer fire.
pub struct PollerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl CompletionPoller {
    pub fn new(status_endpoint: impl Into<String>, interval: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            status_endpoint: status_endpoint.into(),
            interval,
        }
    }

    /// Start polling `GET {status_endpoint}/{session_id}`. On the first
    /// observed `completed` or `terminated`, `on_complete` fires once and the
    /// loop exits.
    pub fn start(&self, session_id: String, on_complete: CompletionCallback) -> PollerHandle {
        let client = self.client.clone();
        let url = format!("{}/{}/status", self.status_endpoint, session_id);
        let interval = self.interval;
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            debug!("Completion poller started for session {} (interval: {:?})", session_id, interval);
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a just-launched
            // session gets a full interval before its first read.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Completion poller cancelled for session {}", session_id);
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                match read_status(&client, &url).await {
                    Ok(status) if status.status.is_finished() => {
                        // Cancellation between the read and the callback must
                        // still win: no callback after stop().
                        if task_token.is_cancelled() {
                            return;
                        }
                        info!("Poller observed session {} finished ({:?})", session_id, status.status);
                        on_complete();
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Status poll for session {} failed, will retry: {:#}", session_id, e);
                    }
                }
            }
        });

        PollerHandle { token, task }
    }
}

async fn read_status(client: &Client, url: &str) -> anyhow::Result<StatusResponse> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("status read returned {}", response.status());
    }
    Ok(response.json::<StatusResponse>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn stop_is_idempotent_and_prevents_callback() {
        let poller = CompletionPoller::new("http://127.0.0.1:1/sessions", Duration::from_millis(20));
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = poller.start("s-1".to_string(), {
            let fired = fired.clone();
            Arc::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        });

        handle.stop();
        handle.stop();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_stopped());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_errors_keep_the_loop_alive() {
        // Unroutable endpoint: every tick fails, the loop must keep running.
        let poller = CompletionPoller::new("http://127.0.0.1:1/sessions", Duration::from_millis(10));
        let handle = poller.start("s-2".to_string(), Arc::new(|| {}));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!handle.task.is_finished());
        handle.stop();
    }
}
