//! STOMP 1.2 frames as carried in WebSocket text messages.

use crate::error::{PartyLinkError, Result};

const NUL: char = '\0';

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of header `key`. Repeated headers keep the first
    /// occurrence.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `CONNECT` for `host`, offering to send and asking to receive a
    /// heart-beat every `heart_beat_ms` (`0` disables both directions).
    pub fn connect(host: &str, heart_beat_ms: u64) -> Self {
        Self::new("CONNECT")
            .header("accept-version", "1.2,1.1,1.0")
            .header("host", host)
            .header("heart-beat", format!("{},{}", heart_beat_ms, heart_beat_ms))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new("SUBSCRIBE")
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn send(destination: &str, body: &str) -> Self {
        Self::new("SEND")
            .header("destination", destination)
            .header("content-type", "application/json")
            .header("content-length", body.len().to_string())
            .with_body(body)
    }

    pub fn disconnect() -> Self {
        Self::new("DISCONNECT")
    }

    fn escapes_headers(&self) -> bool {
        !matches!(self.command.as_str(), "CONNECT" | "CONNECTED")
    }

    /// Serialize to wire text, NUL-terminated.
    pub fn encode(&self) -> String {
        let escape = self.escapes_headers();
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (key, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(key));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }

    fn parse_one(chunk: &str) -> Result<Self> {
        let (head, body) = match chunk.find("\n\n") {
            Some(idx) => (&chunk[..idx], &chunk[idx + 2..]),
            None => match chunk.find("\r\n\r\n") {
                Some(idx) => (&chunk[..idx], &chunk[idx + 4..]),
                None => (chunk, ""),
            },
        };

        let mut lines = head.lines();
        let command = lines
            .next()
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PartyLinkError::ProtocolError("STOMP frame without command".to_string()))?;

        let mut frame = StompFrame::new(command);
        let unescape = frame.escapes_headers();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| {
                PartyLinkError::ProtocolError(format!("Malformed STOMP header line '{}'", line))
            })?;
            if unescape {
                frame.headers.push((unescape_header(key)?, unescape_header(value)?));
            } else {
                frame.headers.push((key.to_string(), value.to_string()));
            }
        }
        frame.body = body.to_string();
        Ok(frame)
    }
}

/// Heart-beat periods agreed in the `CONNECT` / `CONNECTED` exchange, in
/// milliseconds. `0` means none in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    /// How often the client must send.
    pub outgoing_ms: u64,
    /// How often the server promised to send.
    pub incoming_ms: u64,
}

impl HeartBeat {
    /// Combine the client's offer with the server's `heart-beat` header.
    /// A missing or unreadable header disables heart-beating.
    pub fn negotiate(client_ms: u64, server_header: Option<&str>) -> Self {
        let Some((sx, sy)) = server_header.and_then(parse_heart_beat) else {
            return Self::default();
        };
        let pick = |ours: u64, theirs: u64| if ours == 0 || theirs == 0 { 0 } else { ours.max(theirs) };
        Self {
            outgoing_ms: pick(client_ms, sy),
            incoming_ms: pick(client_ms, sx),
        }
    }
}

fn parse_heart_beat(value: &str) -> Option<(u64, u64)> {
    let (x, y) = value.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Split a WebSocket message into frames. Bare newlines between frames are
/// heart-beats and are skipped.
pub fn parse_frames(raw: &str) -> Result<Vec<StompFrame>> {
    raw.split(NUL)
        .map(|chunk| chunk.trim_start_matches(['\r', '\n']))
        .filter(|chunk| !chunk.is_empty())
        .map(StompFrame::parse_one)
        .collect()
}

fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(PartyLinkError::ProtocolError(format!(
                    "Invalid STOMP header escape '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )));
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_send_frame() {
        let frame = StompFrame::send("/app/chat.message", "{\"message\":\"hi\"}");
        assert_eq!(
            frame.encode(),
            "SEND\ndestination:/app/chat.message\ncontent-type:application/json\ncontent-length:16\n\n{\"message\":\"hi\"}\0"
        );
    }

    #[test]
    fn test_connect_headers_are_not_escaped() {
        let encoded = StompFrame::connect("localhost:8080", 10000).encode();
        assert!(encoded.starts_with("CONNECT\n"));
        assert!(encoded.contains("host:localhost:8080\n"));
        assert!(encoded.contains("heart-beat:10000,10000\n"));
    }

    #[test]
    fn test_heart_beat_negotiation() {
        assert_eq!(
            HeartBeat::negotiate(10000, Some("0,0")),
            HeartBeat { outgoing_ms: 0, incoming_ms: 0 }
        );
        assert_eq!(
            HeartBeat::negotiate(10000, Some("25000,5000")),
            HeartBeat { outgoing_ms: 10000, incoming_ms: 25000 }
        );
        assert_eq!(
            HeartBeat::negotiate(0, Some("5000,5000")),
            HeartBeat::default()
        );
        assert_eq!(HeartBeat::negotiate(10000, None), HeartBeat::default());
        assert_eq!(HeartBeat::negotiate(10000, Some("soon")), HeartBeat::default());
    }

    #[test]
    fn test_escaped_header_values() {
        let encoded = StompFrame::new("SEND").header("note", "a:b\nc").encode();
        assert!(encoded.contains("note:a\\cb\\nc\n"));

        let parsed = parse_frames(&encoded).unwrap();
        assert_eq!(parsed[0].get_header("note"), Some("a:b\nc"));
    }

    #[test]
    fn test_parse_multiple_frames_with_heartbeats() {
        let raw = "\nCONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0\r\nMESSAGE\ndestination:/topic/events\nsubscription:sub-0\nmessage-id:1\n\n{\"id\":\"e1\"}\0\n";
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, "CONNECTED");
        assert_eq!(frames[0].get_header("version"), Some("1.2"));
        assert_eq!(frames[1].command, "MESSAGE");
        assert_eq!(frames[1].get_header("destination"), Some("/topic/events"));
        assert_eq!(frames[1].body, "{\"id\":\"e1\"}");
    }

    #[test]
    fn test_first_repeated_header_wins() {
        let frames = parse_frames("MESSAGE\nfoo:first\nfoo:second\n\nbody\0").unwrap();
        assert_eq!(frames[0].get_header("foo"), Some("first"));
    }

    #[test]
    fn test_heartbeat_only_message_yields_no_frames() {
        assert!(parse_frames("\n").unwrap().is_empty());
        assert!(parse_frames("\r\n\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_frames() {
        assert!(parse_frames("MESSAGE\nno-colon-here\n\nbody\0").is_err());
        assert!(parse_frames("MESSAGE\nbad:esc\\x\n\n\0").is_err());
    }
}
