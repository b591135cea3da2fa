//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to its defaults so a partial file is enough.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::parser::{
    ParserLimits, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADERS, DEFAULT_MAX_HEAD_SIZE,
};
use crate::net::session::{SessionSettings, DEFAULT_MAX_REQUESTS};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Worker pool sizing.
    pub pool: PoolConfig,

    /// Per-connection read and write deadlines.
    pub timeouts: TimeoutConfig,

    /// Parser and per-connection limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Settings handed to every session of this server.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            read_timeout: self.timeouts.read_timeout(),
            write_timeout: self.timeouts.write_timeout(),
            limits: self.limits.parser_limits(),
            max_requests: self.limits.max_requests_per_connection,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host name or IP address to bind.
    pub host: String,

    /// TCP port; 0 asks the OS for an ephemeral port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8085,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads; 0 means one per hardware thread.
    pub workers: usize,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum wait for the next bytes from a client, in seconds.
    pub read_secs: u64,

    /// Maximum time to write one response, in seconds.
    pub write_secs: u64,
}

impl TimeoutConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 10,
            write_secs: 30,
        }
    }
}

/// Request size and connection limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted body (declared or decoded), in bytes.
    pub max_body_size: usize,

    /// Largest accepted request line plus headers, in bytes.
    pub max_head_size: usize,

    /// Maximum number of header lines per request.
    pub max_headers: usize,

    /// Requests served on one connection before it is closed.
    pub max_requests_per_connection: usize,
}

impl LimitsConfig {
    pub fn parser_limits(&self) -> ParserLimits {
        ParserLimits {
            max_body_size: self.max_body_size,
            max_head_size: self.max_head_size,
            max_headers: self.max_headers,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            max_headers: DEFAULT_MAX_HEADERS,
            max_requests_per_connection: DEFAULT_MAX_REQUESTS,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
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
