//! Realtime client handle and builder.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use crate::connection::{connection_task, ConnCmd, ConnectionState, TaskContext, COMMAND_CHANNEL_CAPACITY};
use crate::error::{PartyLinkError, Result};
use crate::event_handlers::EventHandlers;
use crate::identity::Identity;
use crate::listeners::{EventListener, ListenerRegistry, SharedRegistry};
use crate::models::{
    ConnectionInfo, ConnectionOptions, ConnectionStatus, OutboundMessage, RealtimeEvent,
    TransportKind,
};
use crate::reconnect::ReconnectPolicy;
use crate::timeouts::LinkTimeouts;
use crate::transport::{create_transport, Transport};

/// Client for the party service's realtime event stream.
///
/// Cheap to clone; clones share one connection, one listener registry and
/// one identity. Connection failures never surface as errors from
/// [`connect`](Self::connect): observe [`status`](Self::status),
/// [`watch_status`](Self::watch_status) or the lifecycle
/// [`EventHandlers`] instead.
///
/// # Examples
///
/// ```rust,no_run
/// use party_link::{EventType, RealtimeClient};
///
/// # async fn example() -> party_link::Result<()> {
/// let client = RealtimeClient::builder()
///     .base_url("http://localhost:8080/api")
///     .build()?;
///
/// client.on(EventType::PartyUpdated, |event| {
///     println!("party {:?} updated: {}", event.target_id, event.message);
/// });
/// client.on("*", |event| println!("[{}] {}", event.event_type, event.id));
///
/// client.connect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    timeouts: LinkTimeouts,
    state: Arc<ConnectionState>,
    listeners: SharedRegistry,
    identity: Arc<RwLock<Identity>>,
    control: Mutex<TaskControl>,
}

#[derive(Default)]
struct TaskControl {
    cmd_tx: Option<mpsc::Sender<ConnCmd>>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeClient {
    pub fn builder() -> RealtimeClientBuilder {
        RealtimeClientBuilder::new()
    }

    // ---------------------------------------------------------------
    // Connection lifecycle
    // ---------------------------------------------------------------

    /// Start connecting in the background.
    ///
    /// No-op while a connection is connecting, open or waiting to retry.
    /// Returns as soon as the attempt is initiated.
    pub async fn connect(&self) {
        let mut control = self.inner.control.lock().await;
        let status = self.inner.state.status();
        let running = control.task.as_ref().is_some_and(|task| !task.is_finished());
        if running && status.is_active() {
            log::info!("[party-link] connect() ignored: connection is {}", status);
            return;
        }

        if let Some(task) = control.task.take() {
            task.abort();
            let _ = task.await;
        }

        let generation = self.inner.state.next_generation();
        self.inner.state.clear_error();
        self.inner.state.set_status(ConnectionStatus::Connecting);

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let ctx = TaskContext {
            transport: self.inner.transport.clone(),
            policy: self.inner.policy,
            timeouts: self.inner.timeouts.clone(),
            state: self.inner.state.clone(),
            listeners: self.inner.listeners.clone(),
            identity: self.inner.identity.clone(),
            generation,
        };
        log::debug!(
            "[party-link] Starting {} connection task (generation {})",
            self.inner.transport.kind(),
            generation
        );
        control.task = Some(tokio::spawn(connection_task(cmd_rx, ctx)));
        control.cmd_tx = Some(cmd_tx);
    }

    /// Close the connection and cancel any pending retry.
    ///
    /// On STOMP a leave notification is sent first. Listeners stay
    /// registered. Idempotent.
    pub async fn disconnect(&self) {
        let mut control = self.inner.control.lock().await;
        self.inner.state.next_generation();
        let cmd_tx = control.cmd_tx.take();

        match control.task.take() {
            Some(task) if !task.is_finished() => {
                let (done_tx, done_rx) = oneshot::channel();
                let sent = match &cmd_tx {
                    Some(tx) => tx.send(ConnCmd::Shutdown { done: done_tx }).await.is_ok(),
                    None => false,
                };
                let acknowledged = sent && self.await_shutdown(done_rx).await;
                if !acknowledged {
                    log::warn!("[party-link] Connection task did not stop in time; aborting it");
                    task.abort();
                }
                let _ = task.await;
            },
            Some(_) => {},
            None => log::debug!("[party-link] disconnect() on an idle client"),
        }

        self.inner.state.mark_disconnected();
    }

    async fn await_shutdown(&self, done_rx: oneshot::Receiver<()>) -> bool {
        let limit = self.inner.timeouts.shutdown_timeout;
        if LinkTimeouts::is_no_timeout(limit) {
            return done_rx.await.is_ok();
        }
        matches!(tokio::time::timeout(limit, done_rx).await, Ok(Ok(())))
    }

    // ---------------------------------------------------------------
    // Outbound messages (STOMP only)
    // ---------------------------------------------------------------

    /// Send a chat message. Returns `false` when the message was dropped
    /// (not connected, or the transport is receive-only).
    pub async fn send_chat_message(&self, message: impl Into<String>) -> bool {
        let identity = self.identity();
        self.send_outbound(OutboundMessage::ChatMessage {
            user_id: identity.client_id,
            username: identity.username,
            message: message.into(),
        })
        .await
    }

    /// Ask the server to push the current status of `party_id`.
    pub async fn request_party_status_update(&self, party_id: impl Into<String>) -> bool {
        self.send_outbound(OutboundMessage::PartyStatusRequest {
            party_id: party_id.into(),
            user_id: self.client_id(),
        })
        .await
    }

    /// Ask the server to push a notification of `kind`.
    pub async fn request_notification(&self, kind: impl Into<String>) -> bool {
        self.send_outbound(OutboundMessage::NotificationRequest {
            user_id: self.client_id(),
            kind: kind.into(),
        })
        .await
    }

    async fn send_outbound(&self, message: OutboundMessage) -> bool {
        let kind = self.inner.transport.kind();
        if !kind.supports_outbound() {
            log::warn!(
                "[party-link] {} transport is receive-only; dropping message to {}",
                kind,
                message.destination()
            );
            return false;
        }
        let status = self.status();
        if status != ConnectionStatus::Connected {
            log::warn!(
                "[party-link] Not connected ({}); dropping message to {}",
                status,
                message.destination()
            );
            return false;
        }

        let payload = match message.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("[party-link] Failed to encode {}: {}", message.destination(), e);
                return false;
            },
        };

        let cmd_tx = self.inner.control.lock().await.cmd_tx.clone();
        let Some(cmd_tx) = cmd_tx else {
            log::warn!("[party-link] No connection task; dropping message to {}", message.destination());
            return false;
        };
        cmd_tx
            .send(ConnCmd::Send {
                destination: message.destination().to_string(),
                payload,
            })
            .await
            .is_ok()
    }

    // ---------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------

    /// Register `listener` for `event_type` (`"*"` for every event).
    pub fn add_event_listener(&self, event_type: impl AsRef<str>, listener: EventListener) {
        self.write_listeners().add(event_type.as_ref(), listener);
    }

    /// Register a closure and return its handle for later removal.
    pub fn on(
        &self,
        event_type: impl AsRef<str>,
        f: impl Fn(&RealtimeEvent) + Send + Sync + 'static,
    ) -> EventListener {
        let listener = EventListener::new(f);
        self.add_event_listener(event_type, listener.clone());
        listener
    }

    /// Remove the first registration of `listener` under `event_type`.
    pub fn remove_event_listener(&self, event_type: impl AsRef<str>, listener: &EventListener) -> bool {
        self.write_listeners().remove(event_type.as_ref(), listener)
    }

    pub fn remove_all_event_listeners(&self) {
        self.write_listeners().clear();
    }

    pub fn listener_count(&self, event_type: impl AsRef<str>) -> usize {
        self.read_listeners().listener_count(event_type.as_ref())
    }

    fn read_listeners(&self) -> std::sync::RwLockReadGuard<'_, ListenerRegistry> {
        self.inner.listeners.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_listeners(&self) -> std::sync::RwLockWriteGuard<'_, ListenerRegistry> {
        self.inner.listeners.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---------------------------------------------------------------
    // Status & identity
    // ---------------------------------------------------------------

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.status()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Receiver that observes every status transition.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.state.subscribe()
    }

    /// Resolve once the status equals `target`.
    pub async fn wait_for_status(&self, target: ConnectionStatus) {
        let mut rx = self.watch_status();
        let _ = rx.wait_for(|status| *status == target).await;
    }

    /// Retries scheduled since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.reconnect_attempts()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.inner.transport.kind()
    }

    pub fn client_id(&self) -> String {
        self.identity().client_id
    }

    pub fn username(&self) -> String {
        self.identity().username
    }

    /// Override the identity used from the next open onwards.
    pub fn set_user_info(&self, user_id: impl Into<String>, username: impl Into<String>) {
        let identity = Identity::from_client_id(user_id).with_username(username);
        log::debug!("[party-link] Identity set to {} ({})", identity.client_id, identity.username);
        *self.inner.identity.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = identity;
    }

    fn identity(&self) -> Identity {
        self.inner
            .identity
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        let status = self.status();
        let snapshot = self.inner.state.snapshot();
        let (registered_event_types, total_event_listeners) = {
            let registry = self.read_listeners();
            (registry.registered_event_types(), registry.total_listeners())
        };
        ConnectionInfo {
            is_connected: status == ConnectionStatus::Connected,
            status,
            transport: self.transport_kind(),
            client_id: self.client_id(),
            reconnect_attempts: self.inner.state.reconnect_attempts(),
            total_reconnect_attempts: self.inner.state.total_reconnect_attempts(),
            last_error: snapshot.last_error,
            connection_duration_ms: if status == ConnectionStatus::Connected {
                snapshot.connection_duration_ms
            } else {
                0
            },
            last_reconnect_at_ms: snapshot.last_reconnect_at_ms,
            last_heartbeat_at_ms: snapshot.last_heartbeat_at_ms,
            registered_event_types,
            total_event_listeners,
        }
    }

    /// Write [`connection_info`](Self::connection_info) to the log.
    pub fn log_connection_status(&self) {
        let info = self.connection_info();
        log::info!(
            "[party-link] status={} transport={} client_id={} attempts={} total_attempts={} connected_for={}ms listeners={} types={:?}",
            info.status,
            info.transport,
            info.client_id,
            info.reconnect_attempts,
            info.total_reconnect_attempts,
            info.connection_duration_ms,
            info.total_event_listeners,
            info.registered_event_types
        );
        if let Some(err) = &info.last_error {
            log::info!("[party-link] last_error={}", err);
        }
    }
}

/// Builder for configuring [`RealtimeClient`] instances.
pub struct RealtimeClientBuilder {
    base_url: Option<String>,
    connection_options: ConnectionOptions,
    timeouts: LinkTimeouts,
    event_handlers: EventHandlers,
    client_id: Option<String>,
    username: Option<String>,
    custom_transport: Option<Arc<dyn Transport>>,
}

impl RealtimeClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            connection_options: ConnectionOptions::default(),
            timeouts: LinkTimeouts::default(),
            event_handlers: EventHandlers::default(),
            client_id: None,
            username: None,
            custom_transport: None,
        }
    }

    /// Base URL of the party service API, e.g. `http://localhost:8080/api`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    pub fn transport_kind(mut self, kind: TransportKind) -> Self {
        self.connection_options.transport = kind;
        self
    }

    pub fn timeouts(mut self, timeouts: LinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Fixed client / user id instead of a generated one.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn username(mut self, name: impl Into<String>) -> Self {
        self.username = Some(name.into());
        self
    }

    pub fn max_reconnect_attempts(mut self, max_attempts: u32) -> Self {
        self.connection_options.max_reconnect_attempts = max_attempts;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.connection_options.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Use a caller-supplied transport. `base_url` is then optional.
    pub fn custom_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.custom_transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<RealtimeClient> {
        let transport = match self.custom_transport {
            Some(transport) => transport,
            None => {
                let base_url = self
                    .base_url
                    .ok_or_else(|| PartyLinkError::ConfigurationError("base_url is required".into()))?;
                create_transport(&base_url, &self.connection_options, &self.timeouts)?
            },
        };

        let mut identity = match self.client_id {
            Some(id) => Identity::from_client_id(id),
            None => Identity::generate(transport.kind().id_prefix()),
        };
        if let Some(username) = self.username {
            identity = identity.with_username(username);
        }

        Ok(RealtimeClient {
            inner: Arc::new(ClientInner {
                transport,
                policy: ReconnectPolicy::from_options(&self.connection_options),
                timeouts: self.timeouts,
                state: Arc::new(ConnectionState::new(self.event_handlers)),
                listeners: Arc::new(RwLock::new(ListenerRegistry::new())),
                identity: Arc::new(RwLock::new(identity)),
                control: Mutex::new(TaskControl::default()),
            }),
        })
    }
}
