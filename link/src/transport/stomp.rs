//! STOMP-over-WebSocket transport.
//!
//! Opens a WebSocket at `<origin><stomp_endpoint_path>`, performs the STOMP
//! `CONNECT` / `CONNECTED` exchange, then subscribes to the broadcast topics
//! and the per-user queue. `MESSAGE` bodies are realtime event JSON.
//!
//! Heart-beats are negotiated in the handshake. The session sends the
//! client's end-of-line beats itself; the stale-session window follows the
//! rate the broker promised, and is off when the broker promised none.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::stomp_frame::{parse_frames, HeartBeat, StompFrame};
use super::{InboundFrame, Transport, TransportSession};
use crate::error::{PartyLinkError, Result};
use crate::models::{ConnectionOptions, TransportKind};
use crate::timeouts::LinkTimeouts;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Broadcast topics every session subscribes to.
pub const BROADCAST_TOPICS: [&str; 4] = [
    "/topic/events",
    "/topic/user.status",
    "/topic/party.status",
    "/topic/chat",
];

/// Per-user queue for events addressed to `client_id`.
pub fn user_queue(client_id: &str) -> String {
    format!("/user/{}/queue/events", client_id)
}

/// Bidirectional transport speaking STOMP 1.2 over a WebSocket.
#[derive(Debug, Clone)]
pub struct StompTransport {
    ws_url: Url,
    host: String,
    heart_beat_ms: u64,
    send_timeout: Duration,
}

impl StompTransport {
    pub fn new(base_url: &str, options: &ConnectionOptions, timeouts: &LinkTimeouts) -> Result<Self> {
        let ws_url = resolve_ws_url(base_url, &options.stomp_endpoint_path)?;
        let host = match (ws_url.host_str(), ws_url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(PartyLinkError::ConfigurationError(
                    "base_url must include a host".to_string(),
                ))
            },
        };
        Ok(Self {
            ws_url,
            host,
            heart_beat_ms: options.stomp_heart_beat_ms,
            send_timeout: timeouts.send_timeout,
        })
    }

    pub fn ws_url(&self) -> &Url {
        &self.ws_url
    }
}

#[async_trait]
impl Transport for StompTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stomp
    }

    async fn open(&self, client_id: &str) -> Result<Box<dyn TransportSession>> {
        log::debug!("[party-link] Opening STOMP WebSocket {}", self.ws_url);

        let mut ws = match connect_async(self.ws_url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                let status = response.status();
                let body_text = response
                    .body()
                    .as_ref()
                    .filter(|b| !b.is_empty())
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                let message = match status.as_u16() {
                    401 => "Unauthorized: WebSocket requires valid credentials".to_string(),
                    403 => "Forbidden: Access to WebSocket denied".to_string(),
                    code if body_text.is_empty() => format!("WebSocket HTTP error: {}", code),
                    code => format!("WebSocket HTTP error {}: {}", code, body_text),
                };
                return Err(PartyLinkError::TransportError(message));
            },
            Err(e) => {
                return Err(PartyLinkError::TransportError(format!("Connection failed: {}", e)));
            },
        };

        let connect = StompFrame::connect(&self.host, self.heart_beat_ms);
        ws.send(Message::Text(connect.encode().into())).await?;
        let (server_heart_beat, pending) = await_connected(&mut ws).await?;
        let heart_beat = HeartBeat::negotiate(self.heart_beat_ms, server_heart_beat.as_deref());

        let mut destinations: Vec<String> = BROADCAST_TOPICS.iter().map(|t| t.to_string()).collect();
        destinations.push(user_queue(client_id));
        for (idx, destination) in destinations.iter().enumerate() {
            let frame = StompFrame::subscribe(&format!("sub-{}", idx), destination);
            ws.send(Message::Text(frame.encode().into())).await?;
        }

        log::info!(
            "[party-link] STOMP session open for {} ({} subscriptions)",
            client_id,
            destinations.len()
        );
        log::debug!(
            "[party-link] STOMP heart-beat: send every {} ms, expect every {} ms",
            heart_beat.outgoing_ms,
            heart_beat.incoming_ms
        );
        Ok(Box::new(StompSession {
            ws,
            pending,
            heart_beat,
            ticker: heart_beat_ticker(heart_beat.outgoing_ms),
            send_timeout: self.send_timeout,
        }))
    }
}

/// Read until `CONNECTED` and return its `heart-beat` header. Frames that
/// arrive after it in the same message are returned for later delivery.
async fn await_connected(ws: &mut WsStream) -> Result<(Option<String>, VecDeque<Result<InboundFrame>>)> {
    loop {
        let text = match ws.next().await {
            Some(Ok(Message::Text(text))) => text.as_str().to_string(),
            Some(Ok(Message::Binary(data))) => String::from_utf8_lossy(&data).into_owned(),
            Some(Ok(Message::Ping(payload))) => {
                ws.send(Message::Pong(payload)).await?;
                continue;
            },
            Some(Ok(Message::Close(_))) | None => {
                return Err(PartyLinkError::TransportError(
                    "WebSocket closed before STOMP CONNECTED".to_string(),
                ));
            },
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        };

        let mut frames = parse_frames(&text)?.into_iter();
        while let Some(frame) = frames.next() {
            match frame.command.as_str() {
                "CONNECTED" => {
                    log::debug!(
                        "[party-link] STOMP CONNECTED (version {})",
                        frame.get_header("version").unwrap_or("1.0")
                    );
                    let heart_beat = frame.get_header("heart-beat").map(str::to_string);
                    let mut rest = VecDeque::new();
                    for frame in frames {
                        if let Some(item) = inbound_from_frame(frame) {
                            rest.push_back(item);
                        }
                    }
                    return Ok((heart_beat, rest));
                },
                "ERROR" => return Err(stomp_error(&frame)),
                other => log::debug!("[party-link] Ignoring {} frame before CONNECTED", other),
            }
        }
    }
}

fn stomp_error(frame: &StompFrame) -> PartyLinkError {
    let summary = frame.get_header("message").unwrap_or("STOMP ERROR frame");
    if frame.body.trim().is_empty() {
        PartyLinkError::ProtocolError(summary.to_string())
    } else {
        PartyLinkError::ProtocolError(format!("{}: {}", summary, frame.body.trim()))
    }
}

fn inbound_from_frame(frame: StompFrame) -> Option<Result<InboundFrame>> {
    match frame.command.as_str() {
        "MESSAGE" => Some(Ok(InboundFrame::Event(frame.body))),
        "ERROR" => Some(Err(stomp_error(&frame))),
        "RECEIPT" => Some(Ok(InboundFrame::Heartbeat)),
        other => {
            log::debug!("[party-link] Ignoring STOMP {} frame", other);
            None
        },
    }
}

fn heart_beat_ticker(period_ms: u64) -> Option<Interval> {
    if period_ms == 0 {
        return None;
    }
    let period = Duration::from_millis(period_ms);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        },
        None => std::future::pending::<()>().await,
    }
}

struct StompSession {
    ws: WsStream,
    pending: VecDeque<Result<InboundFrame>>,
    heart_beat: HeartBeat,
    ticker: Option<Interval>,
    send_timeout: Duration,
}

impl StompSession {
    fn queue_text(&mut self, text: &str) -> Result<()> {
        let frames = parse_frames(text)?;
        if frames.is_empty() {
            self.pending.push_back(Ok(InboundFrame::Heartbeat));
        }
        for frame in frames {
            if let Some(item) = inbound_from_frame(frame) {
                self.pending.push_back(item);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TransportSession for StompSession {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }

            let ws = &mut self.ws;
            let inbound = tokio::select! {
                inbound = ws.next() => inbound,
                _ = next_tick(&mut self.ticker) => {
                    if let Err(e) = ws.send(Message::Text("\n".to_string().into())).await {
                        return Some(Err(e.into()));
                    }
                    log::trace!("[party-link] Sent STOMP heart-beat");
                    continue;
                }
            };

            match inbound? {
                Ok(Message::Text(text)) => {
                    if let Err(e) = self.queue_text(text.as_str()) {
                        return Some(Err(e));
                    }
                },
                Ok(Message::Binary(data)) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    if let Err(e) = self.queue_text(&text) {
                        return Some(Err(e));
                    }
                },
                Ok(Message::Ping(payload)) => {
                    if let Err(e) = self.ws.send(Message::Pong(payload)).await {
                        return Some(Err(e.into()));
                    }
                    return Some(Ok(InboundFrame::Heartbeat));
                },
                Ok(Message::Pong(_)) => return Some(Ok(InboundFrame::Heartbeat)),
                Ok(Message::Close(frame)) => {
                    match frame {
                        Some(f) => log::info!(
                            "[party-link] Server closed WebSocket (code: {}): {}",
                            u16::from(f.code),
                            f.reason.as_str()
                        ),
                        None => log::info!("[party-link] Server closed WebSocket"),
                    }
                    return None;
                },
                Ok(Message::Frame(_)) => {},
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn send(&mut self, destination: &str, payload: &str) -> Result<()> {
        let frame = StompFrame::send(destination, payload);
        let message = Message::Text(frame.encode().into());
        if LinkTimeouts::is_no_timeout(self.send_timeout) {
            self.ws.send(message).await?;
            return Ok(());
        }
        match tokio::time::timeout(self.send_timeout, self.ws.send(message)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PartyLinkError::TimeoutError(format!(
                "Send to {} timed out ({:?})",
                destination, self.send_timeout
            ))),
        }
    }

    fn idle_window(&self, receive_timeout: Duration) -> Option<Duration> {
        if self.heart_beat.incoming_ms == 0 || LinkTimeouts::is_no_timeout(receive_timeout) {
            return None;
        }
        let promised = Duration::from_millis(self.heart_beat.incoming_ms.saturating_mul(3));
        Some(receive_timeout.max(promised))
    }

    async fn close(&mut self) {
        let disconnect = Message::Text(StompFrame::disconnect().encode().into());
        if let Err(e) = self.ws.send(disconnect).await {
            log::debug!("[party-link] STOMP DISCONNECT not sent: {}", e);
        }
        if let Err(e) = self.ws.close(None).await {
            log::debug!("[party-link] WebSocket close failed: {}", e);
        }
    }
}

/// WebSocket URL for `endpoint_path` on the origin of `base_url`.
pub fn resolve_ws_url(base_url: &str, endpoint_path: &str) -> Result<Url> {
    let base = Url::parse(base_url.trim()).map_err(|e| {
        PartyLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
    })?;

    if base.host_str().is_none() {
        return Err(PartyLinkError::ConfigurationError("base_url must include a host".to_string()));
    }
    if !base.username().is_empty() || base.password().is_some() {
        return Err(PartyLinkError::ConfigurationError(
            "base_url must not include username/password credentials".to_string(),
        ));
    }

    let ws_scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(PartyLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        },
    };

    let mut ws_url = base;
    ws_url.set_scheme(ws_scheme).map_err(|_| {
        PartyLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;
    ws_url.set_path(endpoint_path);
    ws_url.set_query(None);
    ws_url.set_fragment(None);
    Ok(ws_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ws_url() {
        let url = resolve_ws_url("http://localhost:8080/api", "/ws/websocket").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/ws/websocket");

        let url = resolve_ws_url("https://party.example.com", "/ws/websocket").unwrap();
        assert_eq!(url.as_str(), "wss://party.example.com/ws/websocket");
    }

    #[test]
    fn test_resolve_ws_url_rejects_bad_input() {
        assert!(resolve_ws_url("ftp://localhost", "/ws/websocket").is_err());
        assert!(resolve_ws_url("http://a:b@localhost", "/ws/websocket").is_err());
        assert!(resolve_ws_url("::nope::", "/ws/websocket").is_err());
    }

    #[test]
    fn test_transport_host_header() {
        let transport = StompTransport::new(
            "http://localhost:8080/api",
            &ConnectionOptions::default(),
            &LinkTimeouts::default(),
        )
        .unwrap();
        assert_eq!(transport.host, "localhost:8080");
        assert_eq!(transport.ws_url().path(), "/ws/websocket");
    }

    #[test]
    fn test_inbound_from_frame() {
        let message = StompFrame::new("MESSAGE").with_body("{\"id\":\"1\"}");
        assert!(matches!(inbound_from_frame(message), Some(Ok(InboundFrame::Event(_)))));

        let error = StompFrame::new("ERROR").header("message", "Broker down");
        match inbound_from_frame(error) {
            Some(Err(PartyLinkError::ProtocolError(msg))) => assert_eq!(msg, "Broker down"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(inbound_from_frame(StompFrame::new("CONNECTED")).is_none());
        assert_eq!(user_queue("user_abc"), "/user/user_abc/queue/events");
    }
}
