//! Observable connection state shared between the client handle and the
//! connection task.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::time::Instant;

use crate::event_handlers::EventHandlers;
use crate::models::ConnectionStatus;

#[derive(Debug, Default)]
struct Diagnostics {
    last_error: Option<String>,
    connected_at: Option<Instant>,
    last_reconnect_at_ms: Option<u64>,
    last_heartbeat_at_ms: Option<u64>,
}

/// Point-in-time copy of the bookkeeping fields.
#[derive(Debug, Clone, Default)]
pub(crate) struct DiagnosticsSnapshot {
    pub last_error: Option<String>,
    pub connection_duration_ms: u64,
    pub last_reconnect_at_ms: Option<u64>,
    pub last_heartbeat_at_ms: Option<u64>,
}

pub(crate) struct ConnectionState {
    status_tx: watch::Sender<ConnectionStatus>,
    handlers: EventHandlers,
    reconnect_attempts: AtomicU32,
    total_reconnect_attempts: AtomicU64,
    /// Bumped by every explicit `connect()` / `disconnect()`. A task whose
    /// generation is no longer current must not touch the connection.
    generation: AtomicU64,
    diagnostics: Mutex<Diagnostics>,
}

impl ConnectionState {
    pub fn new(handlers: EventHandlers) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            status_tx,
            handlers,
            reconnect_attempts: AtomicU32::new(0),
            total_reconnect_attempts: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            diagnostics: Mutex::new(Diagnostics::default()),
        }
    }

    pub fn handlers(&self) -> &EventHandlers {
        &self.handlers
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Publish `status`. Writing the current value again is not a transition.
    pub fn set_status(&self, status: ConnectionStatus) {
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            log::debug!("[party-link] Status -> {}", status);
            self.handlers.emit_status_change(status);
        }
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    pub fn total_reconnect_attempts(&self) -> u64 {
        self.total_reconnect_attempts.load(Ordering::SeqCst)
    }

    pub fn mark_connected(&self) {
        self.reconnect_attempts.store(0, Ordering::SeqCst);
        {
            let mut diag = self.lock_diagnostics();
            diag.connected_at = Some(Instant::now());
            diag.last_heartbeat_at_ms = Some(now_ms());
            diag.last_error = None;
        }
        self.set_status(ConnectionStatus::Connected);
    }

    /// Count a scheduled retry. Returns the attempt number it represents.
    pub fn begin_reconnect(&self) -> u32 {
        self.total_reconnect_attempts.fetch_add(1, Ordering::SeqCst);
        self.lock_diagnostics().last_reconnect_at_ms = Some(now_ms());
        self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_error(&self, message: impl Into<String>) {
        let mut diag = self.lock_diagnostics();
        diag.last_error = Some(message.into());
        diag.connected_at = None;
    }

    pub fn clear_error(&self) {
        self.lock_diagnostics().last_error = None;
    }

    pub fn record_heartbeat(&self) {
        self.lock_diagnostics().last_heartbeat_at_ms = Some(now_ms());
    }

    /// Explicit disconnect: counter and duration bookkeeping back to zero.
    pub fn mark_disconnected(&self) {
        self.reconnect_attempts.store(0, Ordering::SeqCst);
        self.lock_diagnostics().connected_at = None;
        self.set_status(ConnectionStatus::Disconnected);
    }

    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let diag = self.lock_diagnostics();
        DiagnosticsSnapshot {
            last_error: diag.last_error.clone(),
            connection_duration_ms: diag
                .connected_at
                .map(|at| at.elapsed().as_millis() as u64)
                .unwrap_or(0),
            last_reconnect_at_ms: diag.last_reconnect_at_ms,
            last_heartbeat_at_ms: diag.last_heartbeat_at_ms,
        }
    }

    fn lock_diagnostics(&self) -> std::sync::MutexGuard<'_, Diagnostics> {
        self.diagnostics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_repeated_status_is_not_a_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let state = ConnectionState::new(
            EventHandlers::new().on_status_change(move |s| sink.lock().unwrap().push(s)),
        );

        state.set_status(ConnectionStatus::Connecting);
        state.set_status(ConnectionStatus::Connecting);
        state.mark_connected();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
        assert_eq!(*state.subscribe().borrow(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_reconnect_counters() {
        let state = ConnectionState::new(EventHandlers::new());
        assert_eq!(state.begin_reconnect(), 1);
        assert_eq!(state.begin_reconnect(), 2);
        assert_eq!(state.reconnect_attempts(), 2);

        state.mark_connected();
        assert_eq!(state.reconnect_attempts(), 0);
        assert_eq!(state.total_reconnect_attempts(), 2);
        assert!(state.snapshot().last_reconnect_at_ms.is_some());

        state.begin_reconnect();
        state.mark_disconnected();
        assert_eq!(state.reconnect_attempts(), 0);
        assert_eq!(state.snapshot().connection_duration_ms, 0);
    }

    #[test]
    fn test_generation_guard() {
        let state = ConnectionState::new(EventHandlers::new());
        let first = state.next_generation();
        assert!(state.is_current(first));
        let second = state.next_generation();
        assert!(!state.is_current(first));
        assert!(state.is_current(second));
    }
}
