//! Resolver configuration types.

use serde::{Deserialize, Serialize};

use crate::catalog::TradeCatalog;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Application id sent with every WebSocket connection.
    #[serde(default = "default_app_id")]
    pub app_id: u32,

    /// WebSocket endpoint, without query string.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Response language code.
    #[serde(default = "default_language")]
    pub language: String,

    /// Age in seconds after which a cached contract list is refreshed.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// JSON file backing the key-value store (tokens and contract cache).
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Max API requests per second across all connections.
    #[serde(default = "default_requests_per_sec")]
    pub requests_per_sec: u32,

    /// Outer timeout applied by callers around a resolution.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Trade-type tables.
    #[serde(default)]
    pub catalog: TradeCatalog,
}

impl ResolverConfig {
    /// Full connection URL including `app_id` and language.
    pub fn connection_url(&self) -> String {
        format!(
            "{}?app_id={}&l={}",
            self.ws_url.trim().trim_end_matches('/'),
            self.app_id,
            self.language
        )
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_app_id() -> u32 {
    1089
}
fn default_ws_url() -> String {
    "wss://ws.binaryws.com/websockets/v3".into()
}
fn default_language() -> String {
    "EN".into()
}
fn default_cache_ttl() -> u64 {
    600
}
fn default_store_path() -> String {
    "data/store.json".into()
}
fn default_requests_per_sec() -> u32 {
    5
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            ws_url: default_ws_url(),
            language: default_language(),
            cache_ttl_secs: default_cache_ttl(),
            store_path: default_store_path(),
            requests_per_sec: default_requests_per_sec(),
            request_timeout_secs: default_request_timeout(),
            catalog: TradeCatalog::default(),
        }
    }
}
