// src/config/mod.rs
// All endpoint/timing values come from the environment, with defaults for local use.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    // ── Endpoint Configuration
    pub proxy_endpoint: String,
    pub launch_endpoint: String,
    pub status_endpoint: String,

    // ── Completion Polling
    pub poll_interval_secs: u64,

    // ── HTTP Client
    pub http_timeout_secs: u64,

    // ── Logging
    pub log_level: String,
}

// Handles values with trailing comments and extra whitespace.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        // Load from .env file first if it exists
        let _ = dotenvy::dotenv();

        Self {
            proxy_endpoint: env_var_or(
                "BRIDGE_PROXY_ENDPOINT",
                "http://localhost:3001/content-proxy".to_string(),
            ),
            launch_endpoint: env_var_or(
                "BRIDGE_LAUNCH_ENDPOINT",
                "http://localhost:3001/sessions/launch".to_string(),
            ),
            status_endpoint: env_var_or(
                "BRIDGE_STATUS_ENDPOINT",
                "http://localhost:3001/sessions".to_string(),
            ),
            poll_interval_secs: env_var_or("BRIDGE_POLL_INTERVAL", 10),
            http_timeout_secs: env_var_or("BRIDGE_HTTP_TIMEOUT", 30),
            log_level: env_var_or("BRIDGE_LOG_LEVEL", "info".to_string()),
        }
    }
}

pub static CONFIG: Lazy<BridgeConfig> = Lazy::new(BridgeConfig::from_env);
