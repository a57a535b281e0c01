use serde::{Deserialize, Serialize};

use super::transport_kind::TransportKind;

/// Connection-level options for the realtime client.
///
/// These options control:
/// - Which transport is used (SSE or STOMP-over-WebSocket)
/// - Automatic reconnection on connection loss
/// - Reconnection timing and the retry budget
/// - Endpoint paths on the party service
///
/// # Example
///
/// ```rust
/// use party_link::{ConnectionOptions, TransportKind};
///
/// let options = ConnectionOptions::default()
///     .with_transport(TransportKind::Stomp)
///     .with_reconnect_delay_ms(3000)
///     .with_max_reconnect_attempts(5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Wire transport.
    /// Default: Sse
    #[serde(default)]
    pub transport: TransportKind,

    /// Enable automatic reconnection on connection loss.
    /// Default: true. When false, the first failure is terminal.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Delay in milliseconds before each reconnection attempt.
    /// Default: 1000ms. Fixed unless `exponential_backoff` is set.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Double the delay after every failed attempt, capped at
    /// `max_reconnect_delay_ms`.
    /// Default: false
    #[serde(default)]
    pub exponential_backoff: bool,

    /// Upper bound for the exponential delay.
    /// Default: 30000ms (30 seconds)
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Maximum number of reconnection attempts since the last successful open.
    /// Default: 5. `0` disables reconnection.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// SSE endpoint, appended to the base URL path.
    /// Default: `/sse/connect`
    #[serde(default = "default_sse_connect_path")]
    pub sse_connect_path: String,

    /// WebSocket endpoint for STOMP, resolved against the base URL origin.
    /// SockJS servers expose their raw WebSocket under `<prefix>/websocket`.
    /// Default: `/ws/websocket`
    #[serde(default = "default_stomp_endpoint_path")]
    pub stomp_endpoint_path: String,

    /// STOMP heart-beat period offered in both directions, in milliseconds.
    /// The broker may raise it or disable either direction.
    /// Default: 10000ms. `0` disables heart-beating.
    #[serde(default = "default_stomp_heart_beat_ms")]
    pub stomp_heart_beat_ms: u64,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_sse_connect_path() -> String {
    "/sse/connect".to_string()
}

fn default_stomp_endpoint_path() -> String {
    "/ws/websocket".to_string()
}

fn default_stomp_heart_beat_ms() -> u64 {
    10000
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            exponential_backoff: false,
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            sse_connect_path: default_sse_connect_path(),
            stomp_endpoint_path: default_stomp_endpoint_path(),
            stomp_heart_beat_ms: default_stomp_heart_beat_ms(),
        }
    }
}

impl ConnectionOptions {
    /// Create new connection options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wire transport
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Set whether to automatically reconnect on connection loss
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the delay between reconnection attempts (in milliseconds)
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Switch from the fixed delay to capped exponential backoff
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    /// Set the maximum delay between reconnection attempts (in milliseconds)
    pub fn with_max_reconnect_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_reconnect_delay_ms = max_delay_ms;
        self
    }

    /// Set the maximum number of reconnection attempts (0 disables reconnection)
    pub fn with_max_reconnect_attempts(mut self, max_attempts: u32) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Override the SSE endpoint path
    pub fn with_sse_connect_path(mut self, path: impl Into<String>) -> Self {
        self.sse_connect_path = path.into();
        self
    }

    /// Override the STOMP WebSocket endpoint path
    pub fn with_stomp_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.stomp_endpoint_path = path.into();
        self
    }

    /// Set the STOMP heart-beat period (0 disables heart-beating)
    pub fn with_stomp_heart_beat_ms(mut self, heart_beat_ms: u64) -> Self {
        self.stomp_heart_beat_ms = heart_beat_ms;
        self
    }
}
