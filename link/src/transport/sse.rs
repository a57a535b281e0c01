//! Server-Sent Events transport.
//!
//! `GET <base>/sse/connect?clientId=<id>` with `Accept: text/event-stream`.
//! The server emits a `connect` event on open, periodic `heartbeat` events,
//! and one named event per realtime event (`party_updated`, ...) whose data
//! is the event JSON. Unnamed `message` events are treated the same way.

use async_trait::async_trait;
use eventsource_stream::{Event, Eventsource};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Url;

use super::{InboundFrame, Transport, TransportSession};
use crate::error::{PartyLinkError, Result};
use crate::models::{ConnectionOptions, TransportKind};
use crate::timeouts::LinkTimeouts;

const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Receive-only transport over an HTTP event stream.
#[derive(Debug, Clone)]
pub struct SseTransport {
    endpoint: Url,
    http: reqwest::Client,
}

impl SseTransport {
    pub fn new(base_url: &str, options: &ConnectionOptions, timeouts: &LinkTimeouts) -> Result<Self> {
        let endpoint = resolve_sse_url(base_url, &options.sse_connect_path)?;

        // No overall request timeout: the response body is the long-lived stream.
        let mut builder = reqwest::Client::builder();
        if !LinkTimeouts::is_no_timeout(timeouts.connection_timeout) {
            builder = builder.connect_timeout(timeouts.connection_timeout);
        }
        let http = builder
            .build()
            .map_err(|e| PartyLinkError::ConfigurationError(e.to_string()))?;

        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for SseTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }

    async fn open(&self, client_id: &str) -> Result<Box<dyn TransportSession>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("clientId", client_id);
        log::debug!("[party-link] Opening event stream {}", url);

        let response = self
            .http
            .get(url)
            .header(ACCEPT, EVENT_STREAM_MIME)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                format!("SSE handshake failed: HTTP {}", status.as_u16())
            } else {
                format!("SSE handshake failed: HTTP {}: {}", status.as_u16(), body.trim())
            };
            return Err(PartyLinkError::TransportError(message));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with(EVENT_STREAM_MIME) {
            return Err(PartyLinkError::ProtocolError(format!(
                "Expected {} response, got '{}'",
                EVENT_STREAM_MIME, content_type
            )));
        }

        let events = response
            .bytes_stream()
            .eventsource()
            .map(|item| item.map_err(|e| e.to_string()))
            .boxed();

        log::info!("[party-link] SSE stream open for {}", client_id);
        Ok(Box::new(SseSession { events }))
    }
}

struct SseSession {
    events: BoxStream<'static, std::result::Result<Event, String>>,
}

#[async_trait]
impl TransportSession for SseSession {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame>> {
        match self.events.next().await? {
            Ok(event) => Some(Ok(classify_sse_event(&event.event, event.data))),
            Err(e) => Some(Err(PartyLinkError::NetworkError(format!("SSE stream error: {}", e)))),
        }
    }

    async fn send(&mut self, destination: &str, _payload: &str) -> Result<()> {
        Err(PartyLinkError::Unsupported(format!(
            "SSE transport is receive-only; cannot send to {}",
            destination
        )))
    }

    async fn close(&mut self) {
        // Dropping the body stream closes the HTTP connection.
        self.events = futures_util::stream::empty().boxed();
    }
}

/// Map an SSE event name and data to an inbound frame.
pub(crate) fn classify_sse_event(name: &str, data: String) -> InboundFrame {
    match name {
        "heartbeat" => InboundFrame::Heartbeat,
        "connect" | "reconnect" => InboundFrame::Control {
            name: name.to_string(),
            data,
        },
        _ if data.trim().is_empty() => InboundFrame::Heartbeat,
        _ => InboundFrame::Event(data),
    }
}

/// `<base>` + `connect_path`, with the base path preserved.
pub fn resolve_sse_url(base_url: &str, connect_path: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim()).map_err(|e| {
        PartyLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
    })?;

    match url.scheme() {
        "http" | "https" => {},
        other => {
            return Err(PartyLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}' for SSE; expected http(s)",
                other
            )));
        },
    }
    if url.host_str().is_none() {
        return Err(PartyLinkError::ConfigurationError("base_url must include a host".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(PartyLinkError::ConfigurationError(
            "base_url must not include username/password credentials".to_string(),
        ));
    }

    let path = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        connect_path.trim_start_matches('/')
    );
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_sse_url_appends_to_base_path() {
        let url = resolve_sse_url("http://localhost:8080/api", "/sse/connect").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/sse/connect");

        let url = resolve_sse_url("https://party.example.com/api/", "sse/connect").unwrap();
        assert_eq!(url.as_str(), "https://party.example.com/api/sse/connect");

        let url = resolve_sse_url("http://localhost:8080", "/sse/connect").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/sse/connect");
    }

    #[test]
    fn test_resolve_sse_url_rejects_bad_input() {
        assert!(resolve_sse_url("not a url", "/sse/connect").is_err());
        assert!(resolve_sse_url("ws://localhost:8080", "/sse/connect").is_err());
        assert!(resolve_sse_url("http://user:pw@localhost:8080", "/sse/connect").is_err());
    }

    #[test]
    fn test_classify_sse_event() {
        assert_eq!(
            classify_sse_event("party_updated", "{\"id\":\"1\"}".into()),
            InboundFrame::Event("{\"id\":\"1\"}".into())
        );
        assert_eq!(
            classify_sse_event("message", "{}".into()),
            InboundFrame::Event("{}".into())
        );
        assert_eq!(classify_sse_event("heartbeat", "ping".into()), InboundFrame::Heartbeat);
        assert_eq!(classify_sse_event("message", "  ".into()), InboundFrame::Heartbeat);
        assert_eq!(
            classify_sse_event("connect", "Connected".into()),
            InboundFrame::Control {
                name: "connect".into(),
                data: "Connected".into()
            }
        );
    }
}
