//! WebSocket transport to the Godot editor plugin.
//!
//! Thin wrapper around `tokio-tungstenite` providing type-isolated
//! reader/writer halves ([`WsWriter`], [`WsReader`]) plus the
//! [`WebSocketTransport`] that adapts them to the [`Transport`] contract.
//!
//! # Architecture
//!
//! [`dial`] handles URL→request building and TLS
//! negotiation. [`WebSocketTransport::connect`] wraps it in the configured
//! timeout, stores the writer, and spawns a read loop that forwards text and
//! binary frames into the inbound channel and answers pings.
//!
//! The inbound channel exists from construction, so `receive` may be called
//! before `connect`. Nothing arrives until the link is up.

// Rust guideline compliant 2026-02

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;

use super::{lock, Inbound, LinkState, Transport, TransportError};

/// Concrete WebSocket stream type (avoids repeating the 6-line generic everywhere).
type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Received WebSocket message.
#[derive(Debug)]
pub enum WsMessage {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Ping frame with payload.
    Ping(Vec<u8>),
    /// Pong frame with payload.
    Pong(Vec<u8>),
    /// Close frame with status code and reason.
    Close {
        /// WebSocket close code (1000 = normal, 1005 = no code).
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Write half of a WebSocket connection.
#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Send a UTF-8 text frame.
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Text(text))
            .await
            .context("WebSocket send_text failed")
    }

    /// Send a binary frame.
    pub async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Binary(data))
            .await
            .context("WebSocket send_binary failed")
    }

    /// Send a pong frame in response to a ping.
    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket send_pong failed")
    }

    /// Send a close frame, then flush and close the sink.
    pub async fn close(&mut self) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Close(None))
            .await
            .context("WebSocket send_close failed")?;
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half of a WebSocket connection.
#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Receive the next message, returning `None` when the stream ends.
    ///
    /// Raw `Frame` variants are skipped internally.
    pub async fn recv(&mut self) -> Option<Result<WsMessage>> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Some(Ok(WsMessage::Text(text.to_string())));
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    return Some(Ok(WsMessage::Binary(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Ping(data))) => {
                    return Some(Ok(WsMessage::Ping(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Pong(data))) => {
                    return Some(Ok(WsMessage::Pong(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Close(close_frame))) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return Some(Ok(WsMessage::Close { code, reason }));
                }
                Some(Ok(tungstenite::Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    return Some(Err(anyhow::anyhow!("WebSocket read error: {e}")));
                }
                None => return None,
            }
        }
    }
}

/// Open a WebSocket connection to `url` and split it into halves.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the WebSocket handshake fails.
pub async fn dial(url: &str) -> Result<(WsWriter, WsReader)> {
    use tungstenite::client::IntoClientRequest;

    let request = url
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {url}"))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .context("WebSocket connect failed")?;

    let (sink, stream) = ws_stream.split();

    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Convert an HTTP(S) URL to WS(S) scheme.
///
/// Passes `ws://` and `wss://` through unchanged.
#[must_use]
pub fn http_to_ws_scheme(url: &str) -> String {
    if url.starts_with("wss://") || url.starts_with("ws://") {
        url.to_string()
    } else {
        url.replace("https://", "wss://")
            .replace("http://", "ws://")
    }
}

/// Client-side WebSocket link to the editor.
pub struct WebSocketTransport {
    url: String,
    connect_timeout: Duration,
    /// Write half, present while connected. Shared with the read loop for pongs.
    writer: Arc<tokio::sync::Mutex<Option<WsWriter>>>,
    /// Sender moved into the read loop on connect.
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    /// Receiver handed out by `receive`.
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    state: Arc<Mutex<LinkState>>,
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("url", &self.url)
            .field("connect_timeout", &self.connect_timeout)
            .field("state", &*lock(&self.state))
            .finish_non_exhaustive()
    }
}

impl WebSocketTransport {
    /// Create a transport for `url`. `http(s)://` URLs are rewritten to `ws(s)://`.
    pub fn new(url: &str, connect_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            url: http_to_ws_scheme(url),
            connect_timeout,
            writer: Arc::new(tokio::sync::Mutex::new(None)),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: Mutex::new(Some(rx)),
            reader_task: Mutex::new(None),
            state: Arc::new(Mutex::new(LinkState::Idle)),
        }
    }

    /// Target URL after scheme normalization.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forward frames into the inbound channel until the socket ends.
    async fn read_loop(
        mut reader: WsReader,
        tx: mpsc::UnboundedSender<Vec<u8>>,
        writer: Arc<tokio::sync::Mutex<Option<WsWriter>>>,
        state: Arc<Mutex<LinkState>>,
    ) {
        while let Some(message) = reader.recv().await {
            match message {
                Ok(WsMessage::Text(text)) => {
                    if tx.send(text.into_bytes()).is_err() {
                        break;
                    }
                }
                Ok(WsMessage::Binary(data)) => {
                    if tx.send(data).is_err() {
                        break;
                    }
                }
                Ok(WsMessage::Ping(data)) => {
                    if let Some(w) = writer.lock().await.as_mut() {
                        if let Err(e) = w.send_pong(data).await {
                            log::warn!("[WebSocket] Failed to answer ping: {e:#}");
                        }
                    }
                }
                Ok(WsMessage::Pong(_)) => {}
                Ok(WsMessage::Close { code, reason }) => {
                    log::info!("[WebSocket] Peer closed connection: {code} {reason}");
                    break;
                }
                Err(e) => {
                    log::warn!("[WebSocket] {e:#}");
                    break;
                }
            }
        }
        *lock(&state) = LinkState::Closed;
        writer.lock().await.take();
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        // Holding the writer slot serializes concurrent connects.
        let mut slot = self.writer.lock().await;
        match self.state() {
            LinkState::Closed => return Err(TransportError::Closed),
            LinkState::Connected => return Ok(()),
            LinkState::Idle => {}
        }

        log::info!("[WebSocket] Connecting to {}", self.url);
        let (writer, reader) = tokio::time::timeout(self.connect_timeout, dial(&self.url))
            .await
            .map_err(|_elapsed| {
                TransportError::ConnectFailed(format!(
                    "timed out after {}ms",
                    self.connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| TransportError::ConnectFailed(format!("{e:#}")))?;

        let tx = lock(&self.inbound_tx)
            .take()
            .ok_or(TransportError::Closed)?;
        *slot = Some(writer);
        *lock(&self.state) = LinkState::Connected;
        drop(slot);

        let task = tokio::spawn(Self::read_loop(
            reader,
            tx,
            Arc::clone(&self.writer),
            Arc::clone(&self.state),
        ));
        *lock(&self.reader_task) = Some(task);
        log::info!("[WebSocket] Connected to {}", self.url);
        Ok(())
    }

    async fn disconnect(&self) {
        *lock(&self.state) = LinkState::Closed;
        lock(&self.inbound_tx).take();
        if let Some(task) = lock(&self.reader_task).take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.close().await {
                log::debug!("[WebSocket] Close handshake failed: {e:#}");
            }
        }
    }

    async fn send(&self, message: Vec<u8>) -> Result<(), TransportError> {
        match self.state() {
            LinkState::Idle => return Err(TransportError::NotConnected),
            LinkState::Closed => return Err(TransportError::Closed),
            LinkState::Connected => {}
        }
        let mut slot = self.writer.lock().await;
        let writer = slot.as_mut().ok_or(TransportError::Closed)?;
        let sent = match String::from_utf8(message) {
            Ok(text) => writer.send_text(text).await,
            Err(raw) => writer.send_binary(raw.into_bytes()).await,
        };
        sent.map_err(|e| TransportError::SendFailed(format!("{e:#}")))
    }

    fn receive(&self) -> Result<Inbound, TransportError> {
        lock(&self.inbound_rx)
            .take()
            .map(Inbound::new)
            .ok_or(TransportError::AlreadyReceiving)
    }

    fn state(&self) -> LinkState {
        *lock(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Accept one client and echo its data frames back. Closes after `limit` echoes.
    async fn spawn_echo_server(limit: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut echoed = 0;
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_text() || msg.is_binary() {
                    ws.send(msg).await.unwrap();
                    echoed += 1;
                    if echoed == limit {
                        let _ = ws.close(None).await;
                        break;
                    }
                } else if msg.is_close() {
                    break;
                }
            }
        });
        format!("ws://{addr}")
    }

    #[test]
    fn test_http_to_ws_scheme_https() {
        assert_eq!(
            http_to_ws_scheme("https://example.com"),
            "wss://example.com"
        );
    }

    #[test]
    fn test_http_to_ws_scheme_http() {
        assert_eq!(
            http_to_ws_scheme("http://localhost:9080"),
            "ws://localhost:9080"
        );
    }

    #[test]
    fn test_http_to_ws_scheme_ws_passthrough() {
        assert_eq!(
            http_to_ws_scheme("ws://127.0.0.1:9080/editor"),
            "ws://127.0.0.1:9080/editor"
        );
    }

    #[test]
    fn test_new_normalizes_scheme() {
        let transport = WebSocketTransport::new("http://127.0.0.1:9080", Duration::from_secs(1));
        assert_eq!(transport.url(), "ws://127.0.0.1:9080");
        assert_eq!(transport.state(), LinkState::Idle);
    }

    #[tokio::test]
    async fn test_dial_invalid_url_returns_error() {
        let result = dial("not-a-url").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connect_unreachable_host_fails() {
        let transport = WebSocketTransport::new("ws://127.0.0.1:1/invalid", Duration::from_secs(2));
        let result = transport.connect().await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
        assert_eq!(transport.state(), LinkState::Idle);
    }

    #[tokio::test]
    async fn test_connect_times_out_when_handshake_stalls() {
        // Listener that never accepts: TCP connects, the handshake never completes.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let transport = WebSocketTransport::new(&url, Duration::from_millis(100));

        let result = transport.connect().await;
        match result {
            Err(TransportError::ConnectFailed(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
        drop(listener);
    }

    #[tokio::test]
    async fn test_send_before_connect_is_rejected() {
        let transport = WebSocketTransport::new("ws://127.0.0.1:9", Duration::from_secs(1));
        assert_eq!(
            transport.send(b"{}".to_vec()).await,
            Err(TransportError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_echo_round_trip_and_peer_close() {
        let url = spawn_echo_server(2).await;
        let transport = WebSocketTransport::new(&url, Duration::from_secs(5));
        let mut inbound = transport.receive().unwrap();
        transport.connect().await.unwrap();
        transport.connect().await.unwrap();
        assert_eq!(transport.state(), LinkState::Connected);

        transport.send(br#"{"commandId":"cmd_0"}"#.to_vec()).await.unwrap();
        transport.send(vec![0xff, 0x00]).await.unwrap();

        assert_eq!(inbound.next().await.unwrap(), br#"{"commandId":"cmd_0"}"#.to_vec());
        assert_eq!(inbound.next().await.unwrap(), vec![0xff, 0x00]);
        assert!(inbound.next().await.is_none());
        assert_eq!(transport.state(), LinkState::Closed);
    }

    #[tokio::test]
    async fn test_disconnect_ends_stream() {
        let url = spawn_echo_server(usize::MAX).await;
        let transport = WebSocketTransport::new(&url, Duration::from_secs(5));
        transport.connect().await.unwrap();
        let mut inbound = transport.receive().unwrap();

        transport.disconnect().await;

        assert!(inbound.next().await.is_none());
        assert_eq!(transport.connect().await, Err(TransportError::Closed));
        assert_eq!(
            transport.send(b"late".to_vec()).await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn test_disconnect_before_connect_ends_stream() {
        let transport = WebSocketTransport::new("ws://127.0.0.1:9", Duration::from_secs(1));
        let mut inbound = transport.receive().unwrap();
        transport.disconnect().await;
        assert!(inbound.next().await.is_none());
    }
}
