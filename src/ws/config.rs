//! Stream session configuration.

use std::time::Duration;

use crate::ws::endpoints;

/// Transport handshake timeout.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for stream sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsConfig {
    /// WebSocket URL.
    pub url: String,
    /// Whether to send client-initiated pings.
    pub enable_heartbeat: bool,
    /// Interval between client-initiated pings.
    pub heartbeat_interval: Duration,
    /// Request path covered by the auth frame's signature.
    pub auth_path: String,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: endpoints::WS_LINEAR_SWAP.to_string(),
            enable_heartbeat: true,
            heartbeat_interval: Duration::from_secs(20),
            auth_path: endpoints::AUTH_PATH.to_string(),
        }
    }
}

impl WsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> WsConfigBuilder {
        WsConfigBuilder::new()
    }
}

/// Builder for [`WsConfig`].
#[derive(Debug, Clone, Default)]
pub struct WsConfigBuilder {
    config: WsConfig,
}

impl WsConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: WsConfig::default(),
        }
    }

    /// Set the WebSocket URL (useful for testing).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Enable or disable client-initiated pings.
    pub fn heartbeat(mut self, enabled: bool) -> Self {
        self.config.enable_heartbeat = enabled;
        self
    }

    /// Set the ping interval.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set the path the auth signature covers.
    pub fn auth_path(mut self, path: impl Into<String>) -> Self {
        self.config.auth_path = path.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> WsConfig {
        self.config
    }
}
