// src/shim/mod.rs

//! Compatibility shim: the legacy SCORM-driver vocabulary installed on the
//! hosting context for the duration of one active session.
//!
//! Embedded packages cannot reach cross-origin state, so they resolve a fixed
//! set of capability functions on a trusted ancestor context and drive all
//! tracking through them. Names and return shapes ("true"/"false" strings,
//! "resume"/"ab-initio" entry modes) are the de-facto contract of unmodified
//! third-party content and must not be modernized.
//!
//! Every `Set*` call updates the in-memory cache synchronously before the
//! asynchronous persistence dispatch, so an immediately-following `Get*`
//! observes the new value whether or not the write ever lands.

pub mod host;

pub use host::{CapabilityFn, HostContext};

use crate::session::LaunchResponse;
use crate::statements::{StateId, StatementEmitter, Verb};
use crate::utils::{CompletionCallback, LegacyBool};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Entry modes the driver convention defines.
const ENTRY_RESUME: &str = "resume";
const ENTRY_FRESH: &str = "ab-initio";

/// Every name the shim installs, in one place so uninstall cannot miss one.
const VOCABULARY: &[&str] = &[
    "IsLmsPresent",
    "GetBookmark",
    "SetBookmark",
    "GetDataChunk",
    "SetDataChunk",
    "CommitData",
    "Finish",
    "SetReachedEnd",
    "SetFailed",
    "SetPassed",
    "GetProgressMeasure",
    "SetProgressMeasure",
    "GetEntryMode",
    "SetScore",
    "GetScore",
    "ResetStatus",
    "SetTimeLimitAction",
    "WriteToDebug",
];

/// Mutable session-scoped state the vocabulary closes over. Captured at
/// install time, which is why a new session must never reuse an old
/// installation.
struct ShimState {
    bookmark: Mutex<String>,
    suspend_data: Mutex<String>,
    progress_measure: Mutex<f64>,
    resumed: bool,
    terminated: AtomicBool,
}

/// Handle to one active installation. Uninstall removes every name the shim
/// put on the context and is safe to call repeatedly.
pub struct ShimHandle {
    ctx: Arc<HostContext>,
    state: Arc<ShimState>,
    emitter: StatementEmitter,
    installed: AtomicBool,
}

/// Install the driver vocabulary on `ctx`, seeded from the launch response.
///
/// Emits `initialized` (or `resumed`) unless read-only mode suppresses all
/// emission. The caller owns the returned handle and must uninstall before
/// installing again; stale closures over a previous session's state would
/// otherwise leak.
pub fn install_shim(
    ctx: Arc<HostContext>,
    launch: &LaunchResponse,
    emitter: StatementEmitter,
    on_complete: CompletionCallback,
) -> ShimHandle {
    let state = Arc::new(ShimState {
        bookmark: Mutex::new(launch.bookmark.clone()),
        suspend_data: Mutex::new(launch.suspend_data.clone()),
        progress_measure: Mutex::new(0.0),
        resumed: launch.resumed,
        terminated: AtomicBool::new(false),
    });

    install_vocabulary(&ctx, &state, &emitter, &on_complete);

    let opening_verb = if launch.resumed { Verb::Resumed } else { Verb::Initialized };
    emitter.emit(opening_verb, None);
    info!(
        "Shim installed for session {} ({} capabilities, entry: {})",
        launch.session_id,
        VOCABULARY.len(),
        if launch.resumed { ENTRY_RESUME } else { ENTRY_FRESH }
    );

    ShimHandle {
        ctx,
        state,
        emitter,
        installed: AtomicBool::new(true),
    }
}

impl ShimHandle {
    /// Best-effort `terminated` on page/tab unload. Multiple unload-style
    /// triggers collapse into at most one statement per installation.
    pub fn notify_unload(&self) {
        terminate_once(&self.state, &self.emitter);
    }

    /// Remove every installed capability. Idempotent.
    pub fn uninstall(&self) {
        if !self.installed.swap(false, Ordering::SeqCst) {
            return;
        }
        for name in VOCABULARY {
            self.ctx.remove(name);
        }
        debug!("Shim uninstalled ({} capabilities removed)", VOCABULARY.len());
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}

fn terminate_once(state: &ShimState, emitter: &StatementEmitter) {
    if !state.terminated.swap(true, Ordering::SeqCst) {
        emitter.emit(Verb::Terminated, None);
    }
}

/// Completion signalled by the content itself (`SetReachedEnd` or a progress
/// measure reaching 1.0). The host callback handles its own idempotence.
fn complete(emitter: &StatementEmitter, result: Option<serde_json::Value>, on_complete: &CompletionCallback) {
    emitter.emit(Verb::Completed, result);
    on_complete();
}

fn install_vocabulary(
    ctx: &Arc<HostContext>,
    state: &Arc<ShimState>,
    emitter: &StatementEmitter,
    on_complete: &CompletionCallback,
) {
    let ok = || LegacyBool(true).as_str().to_string();

    // Presence probe: content walks its ancestor chain until this answers.
    ctx.install("IsLmsPresent", {
        let ok = ok.clone();
        Arc::new(move |_: Option<&str>| ok())
    });

    ctx.install("GetBookmark", {
        let state = state.clone();
        Arc::new(move |_: Option<&str>| state.bookmark.lock().unwrap().clone())
    });

    ctx.install("SetBookmark", {
        let state = state.clone();
        let emitter = emitter.clone();
        Arc::new(move |arg: Option<&str>| {
            let value = arg.unwrap_or_default().to_string();
            *state.bookmark.lock().unwrap() = value.clone();
            emitter.save_state(StateId::Bookmark, value);
            LegacyBool(true).as_str().to_string()
        })
    });

    ctx.install("GetDataChunk", {
        let state = state.clone();
        Arc::new(move |_: Option<&str>| state.suspend_data.lock().unwrap().clone())
    });

    ctx.install("SetDataChunk", {
        let state = state.clone();
        let emitter = emitter.clone();
        Arc::new(move |arg: Option<&str>| {
            let value = arg.unwrap_or_default().to_string();
            *state.suspend_data.lock().unwrap() = value.clone();
            emitter.save_state(StateId::SuspendData, value);
            LegacyBool(true).as_str().to_string()
        })
    });

    // Persistence is already dispatched on every Set*; commit is a flush hint.
    ctx.install("CommitData", {
        let ok = ok.clone();
        Arc::new(move |_: Option<&str>| ok())
    });

    ctx.install("Finish", {
        let state = state.clone();
        let emitter = emitter.clone();
        Arc::new(move |_: Option<&str>| {
            terminate_once(&state, &emitter);
            LegacyBool(true).as_str().to_string()
        })
    });

    ctx.install("SetReachedEnd", {
        let emitter = emitter.clone();
        let on_complete = on_complete.clone();
        Arc::new(move |arg: Option<&str>| {
            // A numeric argument is a raw score attached to the result.
            let result = match arg.and_then(|a| a.parse::<f64>().ok()) {
                Some(score) => Some(serde_json::json!({
                    "completion": true,
                    "score": { "raw": score },
                })),
                None => Some(serde_json::json!({ "completion": true })),
            };
            complete(&emitter, result, &on_complete);
            LegacyBool(true).as_str().to_string()
        })
    });

    ctx.install("SetFailed", {
        let emitter = emitter.clone();
        Arc::new(move |_: Option<&str>| {
            emitter.emit(Verb::Failed, None);
            LegacyBool(true).as_str().to_string()
        })
    });

    ctx.install("SetPassed", {
        let emitter = emitter.clone();
        Arc::new(move |_: Option<&str>| {
            emitter.emit(Verb::Passed, None);
            LegacyBool(true).as_str().to_string()
        })
    });

    ctx.install("GetProgressMeasure", {
        let state = state.clone();
        Arc::new(move |_: Option<&str>| format!("{}", state.progress_measure.lock().unwrap()))
    });

    ctx.install("SetProgressMeasure", {
        let state = state.clone();
        let emitter = emitter.clone();
        let on_complete = on_complete.clone();
        Arc::new(move |arg: Option<&str>| match arg.and_then(|a| a.parse::<f64>().ok()) {
            Some(measure) => {
                *state.progress_measure.lock().unwrap() = measure;
                if measure >= 1.0 {
                    complete(&emitter, Some(serde_json::json!({ "completion": true })), &on_complete);
                }
                LegacyBool(true).as_str().to_string()
            }
            None => LegacyBool(false).as_str().to_string(),
        })
    });

    ctx.install("GetEntryMode", {
        let state = state.clone();
        Arc::new(move |_: Option<&str>| {
            if state.resumed { ENTRY_RESUME.to_string() } else { ENTRY_FRESH.to_string() }
        })
    });

    // Stubs content probes defensively. Answering "true" keeps drivers from
    // falling back to degraded no-LMS modes.
    for stub in ["SetScore", "ResetStatus", "SetTimeLimitAction"] {
        ctx.install(stub, {
            let ok = ok.clone();
            Arc::new(move |_: Option<&str>| ok())
        });
    }

    ctx.install("GetScore", Arc::new(|_: Option<&str>| String::new()));

    ctx.install("WriteToDebug", {
        Arc::new(move |arg: Option<&str>| {
            debug!("Content debug: {}", arg.unwrap_or_default());
            LegacyBool(true).as_str().to_string()
        })
    });
}
