use serde::{Deserialize, Serialize};
use std::fmt;

/// Observable state of the realtime connection.
///
/// ```text
/// disconnected ─connect()─▶ connecting ─open─▶ connected
///       ▲                     │    ▲              │
///       │                  failure │ retry fires  │ failure
///       │                     ▼    │              ▼
///  disconnect()            error ─▶ reconnecting ◀┘
///  (from any)                 │
///                             └─ budget exhausted: stays in error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Initial state, and the state after an explicit `disconnect()`.
    #[default]
    Disconnected,
    /// A transport open is in flight.
    Connecting,
    /// The transport acknowledged the open.
    Connected,
    /// A retry is scheduled after a failure.
    Reconnecting,
    /// The last attempt failed. Terminal once the retry budget is spent.
    Error,
}

impl ConnectionStatus {
    /// `true` while a connection task owns (or is acquiring) a transport.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting | ConnectionStatus::Connected | ConnectionStatus::Reconnecting
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
