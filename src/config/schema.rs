//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default administrative path of the registry endpoint.
pub const DEFAULT_ADMIN_PATH: &str = "/Api/1/Proxies";

/// Root configuration for the registry proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, path base).
    pub listener: ListenerConfig,

    /// Static proxy entries loaded into the registry at startup.
    pub proxies: Vec<StaticProxyConfig>,

    /// Presence broadcast (heartbeat) settings.
    pub presence: PresenceConfig,

    /// Registry endpoint settings.
    pub registry: RegistryConfig,

    /// Request forwarding settings.
    pub forwarding: ForwardingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent requests (backpressure).
    pub max_connections: usize,

    /// Path prefix this server is mounted under (e.g., "/gateway").
    /// Stripped from inbound requests and appended to the announced self URI.
    pub path_base: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            path_base: String::new(),
        }
    }
}

/// A statically configured proxy mapping.
///
/// Missing fields deserialize as empty strings; the registry logs and skips
/// such entries instead of failing the whole file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StaticProxyConfig {
    /// Local path prefix (e.g., "/Shop").
    #[serde(default)]
    pub path: String,

    /// Upstream base URI requests under `path` are forwarded to.
    #[serde(default, alias = "reverseUri", alias = "reverse_target")]
    pub reverse_uri: String,
}

/// Presence broadcast configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Externally reachable base URI of this server. Heartbeats are skipped while unset.
    pub base_uri: Option<String>,

    /// Peer URIs to announce to. The path component is the path this server
    /// is registered under on that peer.
    pub peers: Vec<String>,

    /// Heartbeat interval in seconds.
    pub interval_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            base_uri: None,
            peers: Vec::new(),
            interval_secs: 5,
        }
    }
}

/// Registry endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path of the administrative registry endpoint.
    pub admin_path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            admin_path: DEFAULT_ADMIN_PATH.to_string(),
        }
    }
}

/// Forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Inbound request headers never copied onto the upstream request.
    pub excluded_headers: Vec<String>,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            excluded_headers: [
                "host",
                "connection",
                "keep-alive",
                "proxy-connection",
                "te",
                "trailer",
                "transfer-encoding",
                "upgrade",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        }
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time to wait for upstream response headers in seconds.
    pub upstream_secs: u64,

    /// Time allowed for a single heartbeat call in seconds.
    pub heartbeat_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 100,
            heartbeat_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
