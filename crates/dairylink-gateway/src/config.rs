//! Gateway configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins. `*` allows any origin.
    #[serde(default = "GatewayConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Interval between keep-alive pings on live WebSocket streams.
    #[serde(default = "GatewayConfig::default_ws_ping")]
    pub websocket_ping_seconds: u64,

    /// Close a live WebSocket stream after this long without a client frame.
    /// Pongs count, so a responsive client stays connected.
    #[serde(default = "GatewayConfig::default_ws_idle")]
    pub websocket_idle_seconds: u64,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_ws_ping() -> u64 {
        30
    }

    const fn default_ws_idle() -> u64 {
        90
    }

    const fn default_max_body() -> usize {
        64 * 1024 // 64 KB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Parse a comma-separated origin list, ignoring blanks.
    #[must_use]
    pub fn parse_origins(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Get the WebSocket ping interval as a `Duration`.
    #[must_use]
    pub fn websocket_ping(&self) -> Duration {
        Duration::from_secs(self.websocket_ping_seconds.max(1))
    }

    /// Get the WebSocket idle timeout as a `Duration`.
    ///
    /// Never shorter than two ping intervals.
    #[must_use]
    pub fn websocket_idle(&self) -> Duration {
        let floor = self.websocket_ping().as_secs().saturating_mul(2);
        Duration::from_secs(self.websocket_idle_seconds.max(floor))
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: Self::default_cors_origins(),
            websocket_ping_seconds: Self::default_ws_ping(),
            websocket_idle_seconds: Self::default_ws_idle(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.max_body_bytes, 64 * 1024);
    }

    #[test]
    fn timeout_duration() {
        let config = GatewayConfig::default();
        assert_eq!(config.websocket_ping(), Duration::from_secs(30));
        assert_eq!(config.websocket_idle(), Duration::from_secs(90));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"listen_addr":"127.0.0.1:9000"}"#).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.request_timeout_seconds, 30);
    }

    #[test]
    fn idle_timeout_outlasts_pings() {
        let config = GatewayConfig {
            websocket_ping_seconds: 60,
            websocket_idle_seconds: 10,
            ..GatewayConfig::default()
        };
        assert_eq!(config.websocket_idle(), Duration::from_secs(120));
    }

    #[test]
    fn origins_from_env_value() {
        let origins = GatewayConfig::parse_origins(" https://a.example , ,https://b.example");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }
}
