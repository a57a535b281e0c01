//! Wire transports.
//!
//! This module contains:
//! - [`sse`]: Server-Sent Events over HTTP, receive-only
//! - [`stomp`]: STOMP 1.2 over WebSocket, bidirectional
//! - [`stomp_frame`]: STOMP frame encoding and parsing
//!
//! A [`Transport`] opens [`TransportSession`]s. The connection task owns at
//! most one session at a time and drives it through `next_frame`, `send`
//! and `close`; reconnection and listener dispatch live above this layer.

pub mod sse;
pub mod stomp;
pub mod stomp_frame;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ConnectionOptions, TransportKind};
use crate::timeouts::LinkTimeouts;

pub use sse::SseTransport;
pub use stomp::StompTransport;

/// One unit of inbound traffic, already stripped of transport framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// JSON text of a realtime event.
    Event(String),
    /// Keep-alive traffic. Refreshes the stale-session deadline only.
    Heartbeat,
    /// Transport-level notice (SSE `connect` / `reconnect` events).
    Control { name: String, data: String },
}

/// Factory for sessions against one server.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Open a session identified by `client_id`. Resolves once the server
    /// has acknowledged the session; any error is a failed attempt.
    async fn open(&self, client_id: &str) -> Result<Box<dyn TransportSession>>;
}

/// An open session.
#[async_trait]
pub trait TransportSession: Send {
    /// Next inbound frame. `None` means the server ended the session;
    /// `Some(Err(_))` means it broke.
    async fn next_frame(&mut self) -> Option<Result<InboundFrame>>;

    /// Publish `payload` to `destination`. Receive-only transports return
    /// [`PartyLinkError::Unsupported`](crate::PartyLinkError::Unsupported).
    async fn send(&mut self, destination: &str, payload: &str) -> Result<()>;

    /// Close gracefully. Errors are logged, not returned.
    async fn close(&mut self);

    /// How long the session may stay silent before it is stale, given the
    /// configured `receive_timeout`. `None` disables the check.
    fn idle_window(&self, receive_timeout: Duration) -> Option<Duration> {
        (!LinkTimeouts::is_no_timeout(receive_timeout)).then_some(receive_timeout)
    }
}

/// Build the transport selected by `options.transport`.
pub fn create_transport(
    base_url: &str,
    options: &ConnectionOptions,
    timeouts: &LinkTimeouts,
) -> Result<Arc<dyn Transport>> {
    Ok(match options.transport {
        TransportKind::Sse => Arc::new(SseTransport::new(base_url, options, timeouts)?),
        TransportKind::Stomp => Arc::new(StompTransport::new(base_url, options, timeouts)?),
    })
}
