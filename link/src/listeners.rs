//! Listener registry and typed event fan-out.
//!
//! Listeners are registered per event type name, or under [`WILDCARD`] to
//! receive everything. Dispatch invokes exact-type listeners first, in
//! registration order, then wildcard listeners. A panicking listener is
//! logged and does not stop delivery to the others.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::models::RealtimeEvent;

/// Registration key that matches every event.
pub const WILDCARD: &str = "*";

type ListenerFn = dyn Fn(&RealtimeEvent) + Send + Sync;

/// A callable invoked with each matching event.
///
/// Identity is the allocation, not the closure body: clones of one
/// `EventListener` are the same listener, two `EventListener::new` calls
/// with identical closures are not. Keep the value returned at registration
/// to remove it later.
#[derive(Clone)]
pub struct EventListener(Arc<ListenerFn>);

impl EventListener {
    pub fn new(f: impl Fn(&RealtimeEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn same_as(&self, other: &EventListener) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }

    pub(crate) fn call(&self, event: &RealtimeEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventListener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Ordered listeners keyed by event type name.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    entries: HashMap<String, Vec<EventListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener` under `event_type`. Adding the same listener twice
    /// makes it fire twice.
    pub fn add(&mut self, event_type: &str, listener: EventListener) {
        self.entries.entry(event_type.to_string()).or_default().push(listener);
    }

    /// Remove the first registration of `listener` under `event_type`.
    /// Returns `false` when it was not registered there.
    pub fn remove(&mut self, event_type: &str, listener: &EventListener) -> bool {
        let Some(list) = self.entries.get_mut(event_type) else {
            return false;
        };
        let Some(pos) = list.iter().position(|l| l.same_as(listener)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.entries.remove(event_type);
        }
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.entries.get(event_type).map_or(0, Vec::len)
    }

    pub fn total_listeners(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Type names with at least one listener, sorted.
    pub fn registered_event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.keys().cloned().collect();
        types.sort();
        types
    }

    /// Snapshot of the listeners `event` is delivered to, in call order.
    ///
    /// Unrecognized types only reach wildcard listeners.
    pub fn listeners_for(&self, event: &RealtimeEvent) -> Vec<EventListener> {
        let mut out = Vec::new();
        if event.event_type.is_recognized() {
            if let Some(exact) = self.entries.get(event.event_type.as_str()) {
                out.extend(exact.iter().cloned());
            }
        }
        if let Some(wild) = self.entries.get(WILDCARD) {
            out.extend(wild.iter().cloned());
        }
        out
    }
}

/// Deliver `event` to every matching listener.
///
/// The registry lock is released before any listener runs, so listeners may
/// register or remove listeners; such changes apply from the next event.
pub(crate) fn dispatch_event(registry: &RwLock<ListenerRegistry>, event: &RealtimeEvent) -> usize {
    let targets = {
        let guard = registry.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.listeners_for(event)
    };

    let mut delivered = 0;
    for listener in &targets {
        match catch_unwind(AssertUnwindSafe(|| listener.call(event))) {
            Ok(()) => delivered += 1,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!(
                    "[party-link] Listener for '{}' panicked on event {}: {}",
                    event.event_type,
                    event.id,
                    reason
                );
            },
        }
    }
    delivered
}

/// Shared registry handle used by the client and the connection task.
pub(crate) type SharedRegistry = Arc<RwLock<ListenerRegistry>>;
