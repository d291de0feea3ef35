//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::routing::ProxyRule;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Shared endpoint listener.
    pub listener: ListenerConfig,

    /// Static file serving.
    pub files: FilesConfig,

    /// Filesystem watching and the change-notification stream.
    pub live_reload: LiveReloadConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Administrative API.
    pub admin: AdminConfig,

    /// Settings document (JSON) imported at startup.
    pub rules_file: Option<PathBuf>,

    /// Initial proxy rules, applied before `rules_file`.
    pub rules: Vec<ProxyRule>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). Port 0 picks a free port.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Static file serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Serve files for paths no proxy rule claims.
    pub enabled: bool,

    /// Directory to serve and watch.
    pub root: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from("."),
        }
    }
}

/// Live-reload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LiveReloadConfig {
    /// Watch the serving root and expose the event stream.
    pub enabled: bool,

    /// Path of the event-stream endpoint.
    pub endpoint: String,

    /// Quiet window before a burst of events is reported, in milliseconds.
    pub debounce_ms: u64,

    /// Heartbeat comment interval in seconds.
    pub heartbeat_secs: u64,

    /// Per-connection message queue depth.
    pub subscriber_capacity: usize,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "/events".to_string(),
            debounce_ms: 500,
            heartbeat_secs: 15,
            subscriber_capacity: 10,
        }
    }
}

/// Timeout configuration for forwarding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (until response headers) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Administrative API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the rule management API under `/admin/api`.
    pub enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
