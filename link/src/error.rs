//! Error types for party-link.
//!
//! None of these escape `connect()`, `disconnect()` or listener dispatch:
//! connection failures surface through the observable status and the
//! `on_error` lifecycle handler. They are returned from construction and
//! configuration APIs, and travel between transports and the connection
//! task.

use thiserror::Error;

/// Result type for party-link operations.
pub type Result<T> = std::result::Result<T, PartyLinkError>;

/// Errors that can occur in the realtime client.
#[derive(Error, Debug)]
pub enum PartyLinkError {
    /// Network-level failure (DNS, TCP, TLS, HTTP body).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An operation did not complete in time.
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Transport-level failure (handshake rejected, socket closed, ...).
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The peer violated the wire protocol (bad STOMP frame, ERROR frame,
    /// wrong content type).
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The active transport cannot perform the requested operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for PartyLinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PartyLinkError::TimeoutError(err.to_string())
        } else {
            PartyLinkError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PartyLinkError {
    fn from(err: serde_json::Error) -> Self {
        PartyLinkError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for PartyLinkError {
    fn from(err: toml::de::Error) -> Self {
        PartyLinkError::ConfigurationError(format!("TOML parse error: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PartyLinkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        PartyLinkError::TransportError(err.to_string())
    }
}
