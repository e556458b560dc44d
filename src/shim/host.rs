// src/shim/host.rs
// The explicit hosting context that embedded content resolves capabilities on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A capability callable by embedded content. Arguments and return values are
/// strings because that is all the legacy driver convention carries.
pub type CapabilityFn = Arc<dyn Fn(Option<&str>) -> String + Send + Sync>;

/// Named function table standing in for the shared hosting context the
/// embedded document walks up to.
///
/// The reference is passed explicitly to whoever installs on it; ownership of
/// an installation is tracked by the controller holding the [`ShimHandle`],
/// never by an ambient singleton.
///
/// [`ShimHandle`]: crate::shim::ShimHandle
#[derive(Default)]
pub struct HostContext {
    table: Mutex<HashMap<&'static str, CapabilityFn>>,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn install(&self, name: &'static str, f: CapabilityFn) {
        self.table.lock().unwrap().insert(name, f);
    }

    pub(crate) fn remove(&self, name: &str) -> bool {
        self.table.lock().unwrap().remove(name).is_some()
    }

    /// Resolve and call a capability by name, as embedded content does.
    /// Returns `None` when nothing is installed under that name.
    pub fn invoke(&self, name: &str, arg: Option<&str>) -> Option<String> {
        // Clone the Arc out so the table lock is not held during the call.
        let f = self.table.lock().unwrap().get(name).cloned()?;
        Some(f(arg))
    }

    pub fn installed_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.table.lock().unwrap().keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().unwrap().is_empty()
    }
}
