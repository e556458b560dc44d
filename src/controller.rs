// src/controller.rs
// The owning view component: sequences launch, fetch, shim install, and
// polling, and tears everything down deterministically.

use crate::fetcher::{ContentFetcher, RenderSource};
use crate::launcher::SessionLauncher;
use crate::poller::{CompletionPoller, PollerHandle};
use crate::shim::{HostContext, ShimHandle, install_shim};
use crate::statements::StatementEmitter;
use crate::utils::CompletionCallback;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Whether this open participates in progress tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    Tracked,
    Untracked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Uninitialized,
    Loading,
    /// Content fetched and renderable; in tracked mode this is a transient
    /// stop on the way to `Active`.
    Ready,
    SessionFailed(String),
    LoadFailed(String),
    Active { resumed: bool },
    Completed,
    Unmounted,
}

struct ControllerInner {
    package_id: String,
    entry_path: String,
    mode: ContentMode,
    fetcher: ContentFetcher,
    launcher: SessionLauncher,
    poller: CompletionPoller,
    host: Arc<HostContext>,
    on_complete: CompletionCallback,

    state: Mutex<LifecycleState>,
    credential: Mutex<Option<String>>,
    load_started: AtomicBool,
    cancel: CancellationToken,
    completion_fired: AtomicBool,
    expanded: AtomicBool,

    render: Mutex<Option<RenderSource>>,
    shim: Mutex<Option<ShimHandle>>,
    poll_handle: Mutex<Option<PollerHandle>>,
    session_id: Mutex<Option<String>>,
}

/// Lifecycle controller for one package open.
///
/// States: `Uninitialized → Loading → {Ready | SessionFailed | LoadFailed} →
/// Active → {Completed, Unmounted}`, with `Unmounted` reachable from anywhere.
/// Clones share the same underlying instance.
#[derive(Clone)]
pub struct PlayerController {
    inner: Arc<ControllerInner>,
}

impl PlayerController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        package_id: impl Into<String>,
        entry_path: impl Into<String>,
        mode: ContentMode,
        fetcher: ContentFetcher,
        launcher: SessionLauncher,
        poller: CompletionPoller,
        host: Arc<HostContext>,
        on_complete: CompletionCallback,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                package_id: package_id.into(),
                entry_path: entry_path.into(),
                mode,
                fetcher,
                launcher,
                poller,
                host,
                on_complete,
                state: Mutex::new(LifecycleState::Uninitialized),
                credential: Mutex::new(None),
                load_started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                completion_fired: AtomicBool::new(false),
                expanded: AtomicBool::new(false),
                render: Mutex::new(None),
                shim: Mutex::new(None),
                poll_handle: Mutex::new(None),
                session_id: Mutex::new(None),
            }),
        }
    }

    /// Record the ambient credential. The first non-empty value arms the
    /// load; later rotations update the stored value but never re-trigger a
    /// load or remount an already-rendered package.
    pub fn set_credential(&self, credential: &str) {
        if credential.is_empty() {
            return;
        }
        *self.inner.credential.lock().unwrap() = Some(credential.to_string());
    }

    /// Begin loading. Runs at most once per controller instance; later calls
    /// are no-ops so ambient re-renders cannot restart an open.
    pub async fn open(&self) -> crate::error::Result<()> {
        if self.inner.load_started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.set_state(LifecycleState::Loading);

        // Credential snapshot taken at call time, not cached from construction.
        let credential = self
            .inner
            .credential
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default();

        match self.inner.mode {
            ContentMode::Untracked => self.open_untracked(&credential).await,
            ContentMode::Tracked => self.open_tracked(&credential).await,
        }
    }

    async fn open_untracked(&self, credential: &str) -> crate::error::Result<()> {
        let fetched = self
            .inner
            .fetcher
            .fetch_package(&self.inner.package_id, &self.inner.entry_path, credential)
            .await;
        if self.inner.cancel.is_cancelled() {
            return Ok(());
        }
        match fetched {
            Ok(render) => {
                *self.inner.render.lock().unwrap() = Some(render);
                self.set_state(LifecycleState::Ready);
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::LoadFailed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn open_tracked(&self, credential: &str) -> crate::error::Result<()> {
        let launched = self
            .inner
            .launcher
            .launch(&self.inner.package_id, credential)
            .await;
        if self.inner.cancel.is_cancelled() {
            return Ok(());
        }
        let launch = match launched {
            Ok(launch) => launch,
            Err(e) => {
                self.set_state(LifecycleState::SessionFailed(e.to_string()));
                return Err(e);
            }
        };

        let fetched = self
            .inner
            .fetcher
            .fetch_package(&self.inner.package_id, &self.inner.entry_path, credential)
            .await;
        if self.inner.cancel.is_cancelled() {
            // A render source fetched after cancellation is dropped, which
            // releases it.
            return Ok(());
        }
        let render = match fetched {
            Ok(render) => render,
            Err(e) => {
                self.set_state(LifecycleState::LoadFailed(e.to_string()));
                return Err(e);
            }
        };

        *self.inner.render.lock().unwrap() = Some(render);
        self.set_state(LifecycleState::Ready);

        let completion = self.completion_hook();
        let emitter = StatementEmitter::new(launch.tracking_config.clone(), launch.read_only);

        // Reinstall precondition: a prior installation's closures capture a
        // previous session's state and must go first.
        if let Some(previous) = self.inner.shim.lock().unwrap().take() {
            previous.uninstall();
        }
        let shim = install_shim(self.inner.host.clone(), &launch, emitter, completion.clone());
        *self.inner.shim.lock().unwrap() = Some(shim);

        let poll_handle = self.inner.poller.start(launch.session_id.clone(), completion);
        *self.inner.poll_handle.lock().unwrap() = Some(poll_handle);
        *self.inner.session_id.lock().unwrap() = Some(launch.session_id.clone());

        // An unmount racing the tail of the load wins: tear down what was
        // just acquired instead of leaving it live under an Unmounted state.
        if self.inner.cancel.is_cancelled() {
            self.release_resources();
            return Ok(());
        }

        self.set_state(LifecycleState::Active { resumed: launch.resumed });
        info!(
            "Package {} active in session {} ({})",
            self.inner.package_id,
            launch.session_id,
            if launch.resumed { "resumed" } else { "fresh" }
        );
        Ok(())
    }

    /// Tear down every acquired resource: render source, then poller, then
    /// shim. Each step is a no-op if that resource was never acquired, and a
    /// load still in flight can no longer update state.
    pub fn unmount(&self) {
        self.inner.cancel.cancel();
        self.release_resources();
        *self.inner.state.lock().unwrap() = LifecycleState::Unmounted;
        info!("Controller for package {} unmounted", self.inner.package_id);
    }

    fn release_resources(&self) {
        if let Some(mut render) = self.inner.render.lock().unwrap().take() {
            render.release();
        }
        if let Some(poll_handle) = self.inner.poll_handle.lock().unwrap().take() {
            poll_handle.stop();
        }
        if let Some(shim) = self.inner.shim.lock().unwrap().take() {
            shim.notify_unload();
            shim.uninstall();
        }
    }

    /// Presentation-only expand/collapse; never touches session state.
    pub fn set_expanded(&self, expanded: bool) {
        self.inner.expanded.store(expanded, Ordering::SeqCst);
    }

    pub fn is_expanded(&self) -> bool {
        self.inner.expanded.load(Ordering::SeqCst)
    }

    /// Escape key collapses the expanded view. Presentation-only.
    pub fn handle_escape(&self) {
        self.set_expanded(false);
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.lock().unwrap().clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.lock().unwrap().clone()
    }

    /// Whether a live render source is currently held.
    pub fn has_render(&self) -> bool {
        self.inner
            .render
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|r| !r.is_released())
    }

    pub fn host(&self) -> Arc<HostContext> {
        self.inner.host.clone()
    }

    /// Completion hook shared by the shim path and the poller path. The first
    /// caller wins; repeat observations never re-invoke the host callback,
    /// and nothing fires after unmount.
    fn completion_hook(&self) -> CompletionCallback {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.cancel.is_cancelled() {
                return;
            }
            if inner.completion_fired.swap(true, Ordering::SeqCst) {
                return;
            }
            *inner.state.lock().unwrap() = LifecycleState::Completed;
            (inner.on_complete)();
        })
    }

    fn set_state(&self, next: LifecycleState) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        *self.inner.state.lock().unwrap() = next;
    }
}
