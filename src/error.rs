// src/error.rs

//! Error taxonomy for the playback bridge.
//!
//! Only `Load`, `Launch`, and `Auth` ever cross the component boundary to the
//! user-visible layer. Tracking-transport and polling failures are contained
//! inside the bridge and logged only.

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Fetching package content failed (transport error or non-2xx response).
    /// The message is derived from the response body and is safe to render.
    #[error("failed to load package content: {0}")]
    Load(String),

    /// Negotiating a tracking session failed.
    #[error("failed to launch tracking session: {0}")]
    Launch(String),

    /// No usable credential was available for an authenticated call.
    #[error("missing or invalid credential")]
    Auth,

    /// A caller passed an argument that can never produce a valid request.
    #[error("invalid request: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
