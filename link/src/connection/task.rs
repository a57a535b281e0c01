use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant as TokioInstant;

use super::state::ConnectionState;
use super::FAR_FUTURE;
use crate::error::PartyLinkError;
use crate::event_handlers::{ConnectionError, DisconnectReason};
use crate::identity::Identity;
use crate::listeners::{dispatch_event, SharedRegistry};
use crate::models::{ConnectionStatus, OutboundMessage, RealtimeEvent};
use crate::reconnect::ReconnectPolicy;
use crate::timeouts::LinkTimeouts;
use crate::transport::{InboundFrame, Transport, TransportSession};

/// Commands sent from the client handle to the connection task.
pub(crate) enum ConnCmd {
    Send {
        destination: String,
        payload: String,
    },
    /// Close gracefully and acknowledge on `done`.
    Shutdown { done: oneshot::Sender<()> },
}

/// Everything one connection task needs, cloned out of the client.
pub(crate) struct TaskContext {
    pub transport: Arc<dyn Transport>,
    pub policy: ReconnectPolicy,
    pub timeouts: LinkTimeouts,
    pub state: Arc<ConnectionState>,
    pub listeners: SharedRegistry,
    pub identity: Arc<RwLock<Identity>>,
    pub generation: u64,
}

enum OpenOutcome {
    Opened(Box<dyn TransportSession>),
    Failed(String),
    Shutdown(Option<oneshot::Sender<()>>),
}

enum SessionEnd {
    Failed(String),
    Shutdown(Option<oneshot::Sender<()>>),
}

enum RetryOutcome {
    Retry,
    Stop,
    Shutdown(Option<oneshot::Sender<()>>),
}

/// Background task owning the transport session.
///
/// Opens the session, pumps frames into the listener registry, forwards
/// outbound commands, and on failure applies the reconnect policy. Exits on
/// shutdown, when the retry budget is spent, or when a newer `connect()` /
/// `disconnect()` has made its generation stale.
pub(crate) async fn connection_task(mut cmd_rx: mpsc::Receiver<ConnCmd>, ctx: TaskContext) {
    let handlers = ctx.state.handlers().clone();
    let outbound = ctx.transport.kind().supports_outbound();

    loop {
        if !ctx.state.is_current(ctx.generation) {
            log::debug!("[party-link] Connection task superseded; exiting");
            return;
        }
        ctx.state.set_status(ConnectionStatus::Connecting);

        let client_id = read_identity(&ctx).client_id;
        let failure = match open_session(&mut cmd_rx, &ctx, &client_id).await {
            OpenOutcome::Shutdown(done) => {
                acknowledge(done);
                return;
            },
            OpenOutcome::Failed(message) => {
                log::warn!("[party-link] Connection attempt failed: {}", message);
                message
            },
            OpenOutcome::Opened(mut session) => {
                ctx.state.mark_connected();
                handlers.emit_connect();
                log::info!(
                    "[party-link] Connected via {} as {}",
                    ctx.transport.kind(),
                    client_id
                );

                if outbound {
                    let identity = read_identity(&ctx);
                    let join = OutboundMessage::UserJoin {
                        user_id: identity.client_id,
                        username: identity.username,
                    };
                    send_outbound(&ctx, session.as_mut(), &join).await;
                }

                match run_session(&mut cmd_rx, &ctx, session.as_mut()).await {
                    SessionEnd::Shutdown(done) => {
                        if outbound {
                            let identity = read_identity(&ctx);
                            let leave = OutboundMessage::UserLeave {
                                user_id: identity.client_id,
                                username: identity.username,
                            };
                            send_outbound(&ctx, session.as_mut(), &leave).await;
                        }
                        session.close().await;
                        handlers.emit_disconnect(DisconnectReason::client());
                        log::info!("[party-link] Disconnected");
                        acknowledge(done);
                        return;
                    },
                    SessionEnd::Failed(message) => {
                        log::warn!("[party-link] Connection lost: {}", message);
                        session.close().await;
                        handlers.emit_disconnect(DisconnectReason::lost(message.clone()));
                        message
                    },
                }
            },
        };

        match schedule_retry(&mut cmd_rx, &ctx, failure).await {
            RetryOutcome::Retry => continue,
            RetryOutcome::Stop => return,
            RetryOutcome::Shutdown(done) => {
                acknowledge(done);
                return;
            },
        }
    }
}

/// Open a session, bounded by `connection_timeout`, while still answering
/// commands.
async fn open_session(
    cmd_rx: &mut mpsc::Receiver<ConnCmd>,
    ctx: &TaskContext,
    client_id: &str,
) -> OpenOutcome {
    let connection_timeout = ctx.timeouts.connection_timeout;
    let open = async {
        if LinkTimeouts::is_no_timeout(connection_timeout) {
            return ctx.transport.open(client_id).await;
        }
        match tokio::time::timeout(connection_timeout, ctx.transport.open(client_id)).await {
            Ok(result) => result,
            Err(_) => Err(PartyLinkError::TimeoutError(format!(
                "Connection timeout ({:?})",
                connection_timeout
            ))),
        }
    };
    tokio::pin!(open);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnCmd::Send { destination, .. }) => {
                        log::warn!("[party-link] Not connected; dropping message to {}", destination);
                    },
                    Some(ConnCmd::Shutdown { done }) => return OpenOutcome::Shutdown(Some(done)),
                    None => return OpenOutcome::Shutdown(None),
                }
            }

            result = &mut open => {
                return match result {
                    Ok(session) => OpenOutcome::Opened(session),
                    Err(e) => OpenOutcome::Failed(e.to_string()),
                };
            }
        }
    }
}

async fn run_session(
    cmd_rx: &mut mpsc::Receiver<ConnCmd>,
    ctx: &TaskContext,
    session: &mut dyn TransportSession,
) -> SessionEnd {
    let handlers = ctx.state.handlers();
    let idle_limit = session.idle_window(ctx.timeouts.receive_timeout);
    let has_receive_timeout = idle_limit.is_some();
    let idle_window = idle_limit.unwrap_or(FAR_FUTURE);
    let mut idle_deadline = TokioInstant::now() + idle_window;

    loop {
        let idle_sleep = tokio::time::sleep_until(idle_deadline);
        tokio::pin!(idle_sleep);

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnCmd::Send { destination, payload }) => {
                        handlers.emit_send(&payload);
                        match session.send(&destination, &payload).await {
                            Ok(()) => log::debug!("[party-link] Sent to {}", destination),
                            Err(PartyLinkError::Unsupported(reason)) => {
                                log::warn!("[party-link] Dropping outbound message: {}", reason);
                            },
                            Err(e) => {
                                return SessionEnd::Failed(format!("Send to {} failed: {}", destination, e));
                            },
                        }
                    },
                    Some(ConnCmd::Shutdown { done }) => return SessionEnd::Shutdown(Some(done)),
                    None => return SessionEnd::Shutdown(None),
                }
            }

            _ = &mut idle_sleep, if has_receive_timeout => {
                return SessionEnd::Failed(format!(
                    "No traffic for {:?}; stream considered stale",
                    idle_window
                ));
            }

            frame = session.next_frame() => {
                idle_deadline = TokioInstant::now() + idle_window;
                match frame {
                    Some(Ok(InboundFrame::Event(raw))) => {
                        ctx.state.record_heartbeat();
                        deliver(ctx, &raw);
                    },
                    Some(Ok(InboundFrame::Heartbeat)) => {
                        ctx.state.record_heartbeat();
                        log::trace!("[party-link] Heartbeat");
                    },
                    Some(Ok(InboundFrame::Control { name, data })) => {
                        ctx.state.record_heartbeat();
                        log::debug!("[party-link] Server notice '{}': {}", name, data);
                    },
                    Some(Err(e)) => return SessionEnd::Failed(e.to_string()),
                    None => return SessionEnd::Failed("Server closed the stream".to_string()),
                }
            }
        }
    }
}

/// Parse and fan out one event payload. Malformed payloads are dropped.
fn deliver(ctx: &TaskContext, raw: &str) {
    ctx.state.handlers().emit_receive(raw);
    match RealtimeEvent::from_json(raw) {
        Ok(event) => {
            let delivered = dispatch_event(&ctx.listeners, &event);
            log::debug!(
                "[party-link] {} event {} delivered to {} listener(s)",
                event.event_type,
                event.id,
                delivered
            );
        },
        Err(e) => log::warn!("[party-link] Dropping malformed event payload: {}", e),
    }
}

/// Record the failure and either schedule a retry or stop for good.
async fn schedule_retry(
    cmd_rx: &mut mpsc::Receiver<ConnCmd>,
    ctx: &TaskContext,
    message: String,
) -> RetryOutcome {
    let state = &ctx.state;
    let handlers = state.handlers();
    let attempts = state.reconnect_attempts();

    state.record_error(message.clone());
    state.set_status(ConnectionStatus::Error);

    let Some(delay) = ctx.policy.next_delay(attempts) else {
        let reason = if ctx.policy.is_enabled() {
            format!("Max reconnection attempts ({}) reached", ctx.policy.max_attempts())
        } else {
            "Automatic reconnection is disabled".to_string()
        };
        log::warn!("[party-link] {}; last error: {}", reason, message);
        handlers.emit_error(ConnectionError::new(message, false, attempts));
        state.record_error(reason);
        return RetryOutcome::Stop;
    };

    handlers.emit_error(ConnectionError::new(message, true, attempts));
    let attempt = state.begin_reconnect();
    state.set_status(ConnectionStatus::Reconnecting);
    log::info!(
        "[party-link] Attempting reconnection in {}ms (attempt {}/{})",
        delay.as_millis(),
        attempt,
        ctx.policy.max_attempts()
    );

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnCmd::Send { destination, .. }) => {
                        log::warn!("[party-link] Reconnecting; dropping message to {}", destination);
                    },
                    Some(ConnCmd::Shutdown { done }) => return RetryOutcome::Shutdown(Some(done)),
                    None => return RetryOutcome::Shutdown(None),
                }
            }

            _ = &mut sleep => break,
        }
    }

    if !state.is_current(ctx.generation) {
        log::debug!("[party-link] Retry cancelled by a newer connect/disconnect");
        return RetryOutcome::Stop;
    }
    RetryOutcome::Retry
}

async fn send_outbound(ctx: &TaskContext, session: &mut dyn TransportSession, message: &OutboundMessage) {
    let payload = match message.to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("[party-link] Failed to encode {}: {}", message.destination(), e);
            return;
        },
    };
    ctx.state.handlers().emit_send(&payload);
    if let Err(e) = session.send(message.destination(), &payload).await {
        log::warn!("[party-link] Failed to send to {}: {}", message.destination(), e);
    }
}

fn read_identity(ctx: &TaskContext) -> Identity {
    ctx.identity
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn acknowledge(done: Option<oneshot::Sender<()>>) {
    if let Some(done) = done {
        let _ = done.send(());
    }
}
