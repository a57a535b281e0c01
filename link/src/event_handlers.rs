//! Connection lifecycle hooks.
//!
//! [`EventHandlers`] observe the connection itself; event listeners
//! (see [`crate::listeners`]) observe the parsed [`RealtimeEvent`](crate::RealtimeEvent)s
//! flowing over it. All hooks run on the connection task, so they should
//! return quickly.
//!
//! ```rust,no_run
//! use party_link::{EventHandlers, RealtimeClient};
//!
//! # fn example() -> party_link::Result<()> {
//! let client = RealtimeClient::builder()
//!     .base_url("http://localhost:8080/api")
//!     .event_handlers(
//!         EventHandlers::new()
//!             .on_status_change(|status| println!("now {}", status))
//!             .on_error(|e| if !e.will_retry { eprintln!("gave up: {}", e) }),
//!     )
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::models::ConnectionStatus;

/// Why an open session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    pub message: String,
    /// `true` for `disconnect()`, `false` when the session was lost.
    pub initiated_by_client: bool,
}

impl DisconnectReason {
    pub(crate) fn client() -> Self {
        Self {
            message: "Client disconnected".to_string(),
            initiated_by_client: true,
        }
    }

    pub(crate) fn lost(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            initiated_by_client: false,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A failed open attempt or a lost session, as seen by `on_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    pub message: String,
    /// Whether another attempt is scheduled after this failure.
    pub will_retry: bool,
    /// Retries already spent since the last successful open.
    pub attempt: u32,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>, will_retry: bool, attempt: u32) -> Self {
        Self {
            message: message.into(),
            will_retry,
            attempt,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

type Hook<A> = Arc<dyn Fn(A) + Send + Sync>;
type TextHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional callbacks for connection lifecycle events. Unset hooks are
/// skipped.
#[derive(Clone, Default)]
pub struct EventHandlers {
    connect: Option<Hook<()>>,
    disconnect: Option<Hook<DisconnectReason>>,
    error: Option<Hook<ConnectionError>>,
    status_change: Option<Hook<ConnectionStatus>>,
    receive: Option<TextHook>,
    send: Option<TextHook>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = Vec::new();
        for (name, present) in [
            ("connect", self.connect.is_some()),
            ("disconnect", self.disconnect.is_some()),
            ("error", self.error.is_some()),
            ("status_change", self.status_change.is_some()),
            ("receive", self.receive.is_some()),
            ("send", self.send.is_some()),
        ] {
            if present {
                set.push(name);
            }
        }
        f.debug_tuple("EventHandlers").field(&set).finish()
    }
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transport acknowledged an open.
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.connect = Some(Arc::new(move |()| f()));
        self
    }

    /// An open session ended, by `disconnect()` or by failure.
    pub fn on_disconnect(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.disconnect = Some(Arc::new(f));
        self
    }

    /// An open attempt failed or a session was lost.
    pub fn on_error(mut self, f: impl Fn(ConnectionError) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    /// Every observable status transition, in order. Repeats are suppressed.
    pub fn on_status_change(mut self, f: impl Fn(ConnectionStatus) + Send + Sync + 'static) -> Self {
        self.status_change = Some(Arc::new(f));
        self
    }

    /// Raw inbound event payloads, before parsing.
    pub fn on_receive(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.receive = Some(Arc::new(f));
        self
    }

    /// Raw outbound payloads, before they reach the transport.
    pub fn on_send(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.send = Some(Arc::new(f));
        self
    }

    pub fn has_any(&self) -> bool {
        self.connect.is_some()
            || self.disconnect.is_some()
            || self.error.is_some()
            || self.status_change.is_some()
            || self.receive.is_some()
            || self.send.is_some()
    }

    pub(crate) fn emit_connect(&self) {
        fire(&self.connect, ());
    }

    pub(crate) fn emit_disconnect(&self, reason: DisconnectReason) {
        fire(&self.disconnect, reason);
    }

    pub(crate) fn emit_error(&self, error: ConnectionError) {
        fire(&self.error, error);
    }

    pub(crate) fn emit_status_change(&self, status: ConnectionStatus) {
        fire(&self.status_change, status);
    }

    pub(crate) fn emit_receive(&self, raw: &str) {
        if let Some(hook) = &self.receive {
            hook(raw);
        }
    }

    pub(crate) fn emit_send(&self, raw: &str) {
        if let Some(hook) = &self.send {
            hook(raw);
        }
    }
}

fn fire<A>(hook: &Option<Hook<A>>, arg: A) {
    if let Some(hook) = hook {
        hook(arg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_unset_hooks_are_skipped() {
        let handlers = EventHandlers::new();
        assert!(!handlers.has_any());
        handlers.emit_connect();
        handlers.emit_status_change(ConnectionStatus::Connected);
        handlers.emit_error(ConnectionError::new("boom", true, 1));
        handlers.emit_receive("{}");
    }

    #[test]
    fn test_status_change_hook_sees_transitions_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handlers = EventHandlers::new().on_status_change(move |s| sink.lock().unwrap().push(s));

        assert!(handlers.has_any());
        handlers.emit_status_change(ConnectionStatus::Connecting);
        handlers.emit_status_change(ConnectionStatus::Connected);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
    }

    #[test]
    fn test_connect_and_disconnect_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let on_connect = log.clone();
        let on_disconnect = log.clone();
        let handlers = EventHandlers::new()
            .on_connect(move || on_connect.lock().unwrap().push("connect".to_string()))
            .on_disconnect(move |r| on_disconnect.lock().unwrap().push(format!("{}:{}", r, r.initiated_by_client)));

        handlers.emit_connect();
        handlers.emit_disconnect(DisconnectReason::lost("Server closed the stream"));
        handlers.emit_disconnect(DisconnectReason::client());

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "connect",
                "Server closed the stream:false",
                "Client disconnected:true"
            ]
        );
    }

    #[test]
    fn test_debug_lists_set_hooks() {
        let handlers = EventHandlers::new().on_error(|_| {}).on_send(|_| {});
        assert_eq!(format!("{:?}", handlers), r#"EventHandlers(["error", "send"])"#);
    }
}
