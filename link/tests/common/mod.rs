#![allow(dead_code)]
//! Shared helpers for party-link integration tests: a scripted in-memory
//! transport and polling utilities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use party_link::{
    ConnectionStatus, EventHandlers, InboundFrame, LinkTimeouts, PartyLinkError, RealtimeClient,
    Result, Transport, TransportKind, TransportSession,
};
use serde_json::json;
use tokio::sync::mpsc;

/// What the fake server does on the next `open()`.
enum Step {
    Fail(String),
    Accept(mpsc::UnboundedReceiver<PeerMsg>),
}

enum PeerMsg {
    Frame(InboundFrame),
    Error(String),
    End,
}

#[derive(Default)]
struct Recorded {
    opens: usize,
    client_ids: Vec<String>,
    sent: Vec<(String, String)>,
    closes: usize,
}

/// Transport whose `open()` outcomes are scripted in advance. Once the
/// script runs out, `open()` never completes.
pub struct MockTransport {
    kind: TransportKind,
    script: Mutex<VecDeque<Step>>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockTransport {
    pub fn new(kind: TransportKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            recorded: Arc::new(Mutex::new(Recorded::default())),
        })
    }

    /// Next `open()` fails with `message`.
    pub fn fail(&self, message: &str) {
        self.script.lock().unwrap().push_back(Step::Fail(message.to_string()));
    }

    /// Next `open()` succeeds; the returned peer feeds that session.
    pub fn accept(&self) -> MockPeer {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().push_back(Step::Accept(rx));
        MockPeer { tx }
    }

    pub fn opens(&self) -> usize {
        self.recorded.lock().unwrap().opens
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.recorded.lock().unwrap().client_ids.clone()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.recorded.lock().unwrap().sent.clone()
    }

    pub fn closes(&self) -> usize {
        self.recorded.lock().unwrap().closes
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn open(&self, client_id: &str) -> Result<Box<dyn TransportSession>> {
        {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.opens += 1;
            recorded.client_ids.push(client_id.to_string());
        }
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Fail(message)) => Err(PartyLinkError::NetworkError(message)),
            Some(Step::Accept(rx)) => Ok(Box::new(MockSession {
                kind: self.kind,
                rx,
                recorded: self.recorded.clone(),
            })),
            None => std::future::pending().await,
        }
    }
}

struct MockSession {
    kind: TransportKind,
    rx: mpsc::UnboundedReceiver<PeerMsg>,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl TransportSession for MockSession {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame>> {
        match self.rx.recv().await {
            Some(PeerMsg::Frame(frame)) => Some(Ok(frame)),
            Some(PeerMsg::Error(message)) => Some(Err(PartyLinkError::NetworkError(message))),
            Some(PeerMsg::End) | None => None,
        }
    }

    async fn send(&mut self, destination: &str, payload: &str) -> Result<()> {
        if !self.kind.supports_outbound() {
            return Err(PartyLinkError::Unsupported("mock SSE is receive-only".to_string()));
        }
        self.recorded
            .lock()
            .unwrap()
            .sent
            .push((destination.to_string(), payload.to_string()));
        Ok(())
    }

    async fn close(&mut self) {
        self.recorded.lock().unwrap().closes += 1;
    }
}

/// Server side of one accepted mock session.
pub struct MockPeer {
    tx: mpsc::UnboundedSender<PeerMsg>,
}

impl MockPeer {
    pub fn event(&self, payload: impl Into<String>) {
        let _ = self.tx.send(PeerMsg::Frame(InboundFrame::Event(payload.into())));
    }

    pub fn heartbeat(&self) {
        let _ = self.tx.send(PeerMsg::Frame(InboundFrame::Heartbeat));
    }

    pub fn error(&self, message: &str) {
        let _ = self.tx.send(PeerMsg::Error(message.to_string()));
    }

    pub fn end(&self) {
        let _ = self.tx.send(PeerMsg::End);
    }
}

/// JSON for a realtime event of `event_type`.
pub fn event_json(id: &str, event_type: &str) -> String {
    json!({
        "id": id,
        "type": event_type,
        "targetId": "party-7",
        "userId": "user_server",
        "data": { "source": "test" },
        "timestamp": "2024-05-01T12:00:00",
        "message": format!("{} happened", event_type),
        "broadcast": true,
    })
    .to_string()
}

/// Timeouts with stale-stream detection off, so paused-clock tests can
/// idle without tearing sessions down.
pub fn test_timeouts() -> LinkTimeouts {
    LinkTimeouts::builder()
        .connection_timeout(Duration::from_secs(10))
        .receive_timeout(Duration::ZERO)
        .build()
}

/// Status transitions seen by `on_status_change`, in order.
#[derive(Clone, Default)]
pub struct StatusLog(Arc<Mutex<Vec<ConnectionStatus>>>);

impl StatusLog {
    pub fn handlers(&self) -> EventHandlers {
        let log = self.0.clone();
        EventHandlers::new().on_status_change(move |status| log.lock().unwrap().push(status))
    }

    pub fn snapshot(&self) -> Vec<ConnectionStatus> {
        self.0.lock().unwrap().clone()
    }
}

/// Client over `transport` with fixed 1s retries and budget `max_attempts`.
pub fn client_with(
    transport: Arc<MockTransport>,
    max_attempts: u32,
    handlers: EventHandlers,
) -> RealtimeClient {
    RealtimeClient::builder()
        .custom_transport(transport)
        .client_id("user_test00042")
        .max_reconnect_attempts(max_attempts)
        .reconnect_delay(Duration::from_millis(1000))
        .timeouts(test_timeouts())
        .event_handlers(handlers)
        .build()
        .expect("mock client builds")
}

/// Poll `condition` until it holds, advancing (virtual) time in small steps.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(300);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 300s");
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
