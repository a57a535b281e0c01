use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PartyLinkError;

/// Which wire transport the client uses.
///
/// SSE is the canonical transport. STOMP-over-WebSocket is the alternate
/// backend and the only one that can carry outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Server-Sent Events (`GET <base>/sse/connect`), receive-only.
    #[default]
    #[serde(alias = "eventsource")]
    Sse,

    /// STOMP frames over a WebSocket (`<origin>/ws/websocket`).
    #[serde(alias = "websocket", alias = "ws")]
    Stomp,
}

impl TransportKind {
    /// Whether chat / status / notification requests can be sent.
    pub fn supports_outbound(&self) -> bool {
        matches!(self, TransportKind::Stomp)
    }

    /// Prefix of generated client identifiers (`client_xxx` / `user_xxx`).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            TransportKind::Sse => "client",
            TransportKind::Stomp => "user",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Sse => "sse",
            TransportKind::Stomp => "stomp",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = PartyLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sse" | "eventsource" => Ok(TransportKind::Sse),
            "stomp" | "websocket" | "ws" => Ok(TransportKind::Stomp),
            other => Err(PartyLinkError::ConfigurationError(format!(
                "Unknown transport '{}'; expected 'sse' or 'stomp'",
                other
            ))),
        }
    }
}
