//! SSE transport against a minimal local HTTP server.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::event_json;
use party_link::{
    ConnectionStatus, EventHandlers, EventType, LinkTimeouts, RealtimeClient, TransportKind,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const STREAM_HEADERS: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/event-stream\r\n\
    Cache-Control: no-cache\r\n\
    Connection: close\r\n\r\n";

/// Read the request head and return its request line.
async fn read_request_line(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf).into_owned();
    head.lines().next().unwrap_or_default().to_string()
}

async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

#[tokio::test]
async fn test_sse_stream_delivers_named_and_default_events() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (request_tx, mut request_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request_line = read_request_line(&mut socket).await;
        request_tx.send(request_line).unwrap();

        let body = format!(
            "event: connect\ndata: Connected\n\n\
             event: heartbeat\ndata: ping\n\n\
             event: PARTY_UPDATED\ndata: {}\n\n\
             data: {}\n\n",
            event_json("s1", "PARTY_UPDATED"),
            event_json("s2", "CHARACTER_CREATED"),
        );
        socket.write_all(STREAM_HEADERS.as_bytes()).await.unwrap();
        socket.write_all(body.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        // Hold the stream open until the client goes away.
        let mut sink = [0u8; 64];
        let _ = socket.read(&mut sink).await;
    });

    let client = RealtimeClient::builder()
        .base_url(format!("http://{}/api", addr))
        .transport_kind(TransportKind::Sse)
        .timeouts(LinkTimeouts::for_testing(30))
        .build()
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let party_seen = seen.clone();
    client.on(EventType::PartyUpdated, move |e| {
        party_seen.lock().unwrap().push(format!("party:{}", e.id))
    });
    let all_seen = seen.clone();
    client.on("*", move |e| all_seen.lock().unwrap().push(format!("all:{}", e.id)));

    client.connect().await;
    within(client.wait_for_status(ConnectionStatus::Connected)).await;

    let request_line = within(request_rx.recv()).await.unwrap();
    let expected = format!("GET /api/sse/connect?clientId={} HTTP/1.1", client.client_id());
    assert_eq!(request_line, expected);
    assert!(client.client_id().starts_with("client_"));

    within(async {
        while seen.lock().unwrap().len() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["party:s1", "all:s1", "all:s2"]
    );
    assert!(client.connection_info().last_heartbeat_at_ms.is_some());

    client.disconnect().await;
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_sse_http_error_is_a_failed_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(Mutex::new(0));
    let accepted_count = accepted.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            *accepted_count.lock().unwrap() += 1;
            read_request_line(&mut socket).await;
            let _ = socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
        }
    });

    let errors = Arc::new(Mutex::new(Vec::new()));
    let errors_sink = errors.clone();
    let client = RealtimeClient::builder()
        .base_url(format!("http://{}/api", addr))
        .max_reconnect_attempts(0)
        .event_handlers(EventHandlers::new().on_error(move |e| errors_sink.lock().unwrap().push(e)))
        .build()
        .unwrap();

    client.connect().await;
    within(client.wait_for_status(ConnectionStatus::Error)).await;
    within(async {
        while errors.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    let errors = errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].will_retry);
    assert!(errors[0].message.contains("HTTP 500"), "{}", errors[0].message);
    assert_eq!(*accepted.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_sse_wrong_content_type_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request_line(&mut socket).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 2\r\n\r\nhi")
            .await;
    });

    let client = RealtimeClient::builder()
        .base_url(format!("http://{}/api", addr))
        .max_reconnect_attempts(0)
        .build()
        .unwrap();

    client.connect().await;
    within(client.wait_for_status(ConnectionStatus::Error)).await;
    within(async {
        while client.connection_info().last_error.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert_eq!(
        client.connection_info().last_error.as_deref(),
        Some("Automatic reconnection is disabled")
    );
}
