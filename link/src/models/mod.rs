//! Data models for the party-link client library.
//!
//! Defines the inbound event shape, connection status and options, and the
//! outbound STOMP application messages.

pub mod connection_info;
pub mod connection_options;
pub mod connection_status;
pub mod event_type;
pub mod outbound_message;
pub mod realtime_event;
pub mod transport_kind;


pub use connection_info::ConnectionInfo;
pub use connection_options::ConnectionOptions;
pub use connection_status::ConnectionStatus;
pub use event_type::EventType;
pub use outbound_message::OutboundMessage;
pub use realtime_event::{RealtimeEvent, ANONYMOUS_USER_ID};
pub use transport_kind::TransportKind;
