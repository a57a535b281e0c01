//! # party-link
//!
//! Realtime event client for the party-composition service.
//!
//! The client keeps one long-lived connection to the service, over
//! Server-Sent Events or STOMP-over-WebSocket, parses each pushed
//! [`RealtimeEvent`] and fans it out to listeners registered by event type
//! or under the `"*"` wildcard. Lost connections are retried with a bounded
//! fixed-delay policy. On STOMP the client can also send chat messages and
//! status / notification requests.
//!
//! ```rust,no_run
//! use party_link::{ConnectionStatus, EventHandlers, EventType, RealtimeClient, TransportKind};
//!
//! # async fn example() -> party_link::Result<()> {
//! let client = RealtimeClient::builder()
//!     .base_url("http://localhost:8080/api")
//!     .transport_kind(TransportKind::Stomp)
//!     .event_handlers(EventHandlers::new().on_status_change(|s| log::info!("status: {}", s)))
//!     .build()?;
//!
//! client.on(EventType::PartyOptimized, |event| {
//!     println!("optimized party {:?}: {:?}", event.target_id, event.data);
//! });
//!
//! client.connect().await;
//! client.wait_for_status(ConnectionStatus::Connected).await;
//! client.send_chat_message("ready when you are").await;
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub(crate) mod connection;
pub mod error;
pub mod event_handlers;
pub mod identity;
pub mod listeners;
pub mod models;
pub mod reconnect;
pub mod timeouts;
pub mod transport;

pub use client::{RealtimeClient, RealtimeClientBuilder};
pub use config::LinkConfig;
pub use error::{PartyLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use identity::Identity;
pub use listeners::{EventListener, ListenerRegistry, WILDCARD};
pub use models::{
    ConnectionInfo, ConnectionOptions, ConnectionStatus, EventType, OutboundMessage,
    RealtimeEvent, TransportKind, ANONYMOUS_USER_ID,
};
pub use reconnect::{BackoffStrategy, ReconnectPolicy};
pub use timeouts::{LinkTimeouts, LinkTimeoutsBuilder};
pub use transport::{InboundFrame, Transport, TransportSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
