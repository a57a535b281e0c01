//! Diagnostics snapshot of the realtime connection.
//!
//! [`ConnectionInfo`] is a read-only view assembled on demand by
//! `RealtimeClient::connection_info()`. Useful for debugging, tests and
//! status panels.

use serde::{Deserialize, Serialize};

use super::connection_status::ConnectionStatus;
use super::transport_kind::TransportKind;

/// Read-only snapshot of the connection state and listener registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub is_connected: bool,
    pub status: ConnectionStatus,
    pub transport: TransportKind,
    /// Identifier sent to the server (`clientId` query parameter or STOMP user id).
    pub client_id: String,
    /// Attempts since the last successful open.
    pub reconnect_attempts: u32,
    /// Attempts over the whole client lifetime.
    pub total_reconnect_attempts: u64,
    /// Last failure message, cleared by an explicit `connect()`.
    pub last_error: Option<String>,
    /// Time since the current session opened, 0 when not connected.
    pub connection_duration_ms: u64,
    /// Millis since Unix epoch of the last scheduled reconnect.
    pub last_reconnect_at_ms: Option<u64>,
    /// Millis since Unix epoch of the last inbound frame or heartbeat.
    pub last_heartbeat_at_ms: Option<u64>,
    /// Event types with at least one listener, sorted.
    pub registered_event_types: Vec<String>,
    pub total_event_listeners: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info_serializes_status_lowercase() {
        let info = ConnectionInfo {
            is_connected: false,
            status: ConnectionStatus::Reconnecting,
            transport: TransportKind::Sse,
            client_id: "client_abc123xyz".to_string(),
            reconnect_attempts: 2,
            total_reconnect_attempts: 7,
            last_error: Some("Connection refused".to_string()),
            connection_duration_ms: 0,
            last_reconnect_at_ms: Some(1700000000000),
            last_heartbeat_at_ms: None,
            registered_event_types: vec!["*".to_string(), "PARTY_UPDATED".to_string()],
            total_event_listeners: 3,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"status\":\"reconnecting\""));
        assert!(json.contains("\"transport\":\"sse\""));
        let parsed: ConnectionInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
    }
}
