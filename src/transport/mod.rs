//! Duplex message transports.
//!
//! Every link in the bridge (the MCP consumer on stdio, the Godot editor on a
//! WebSocket, and in-process peers in tests) is a [`Transport`]: a
//! bidirectional channel of whole byte messages.
//!
//! # Architecture
//!
//! ```text
//! Transport (trait)
//!     │
//!     ├── StdioTransport      newline-delimited messages on stdin/stdout
//!     ├── WebSocketTransport  text/binary frames over tokio-tungstenite
//!     └── MemoryTransport     in-process mailbox pair (tests, embedding)
//! ```
//!
//! # Contract
//!
//! - [`Transport::connect`] is idempotent while connected.
//! - [`Transport::send`] fails with [`TransportError::NotConnected`] until
//!   `connect` has completed.
//! - [`Transport::receive`] hands out the inbound sequence exactly once per
//!   instance. Starting over means building a new transport.
//! - [`Transport::disconnect`] ends the inbound sequence cleanly (`None`),
//!   never with an error.

pub mod memory;
pub mod stdio;
pub mod websocket;

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use memory::MemoryTransport;
pub use stdio::StdioTransport;
pub use websocket::WebSocketTransport;

/// Lifecycle state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Not yet connected.
    #[default]
    Idle,
    /// Connected and able to send.
    Connected,
    /// Disconnected for good; this instance cannot be reused.
    Closed,
}

/// Errors that can occur during transport operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// `send` was called before `connect` completed.
    NotConnected,
    /// The transport has been disconnected.
    Closed,
    /// The inbound sequence was already handed out.
    AlreadyReceiving,
    /// Failed to establish the connection.
    ConnectFailed(String),
    /// Failed to write a message.
    SendFailed(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "Transport is not connected"),
            Self::Closed => write!(f, "Transport closed"),
            Self::AlreadyReceiving => write!(f, "Inbound stream already taken"),
            Self::ConnectFailed(msg) => write!(f, "Connection failed: {msg}"),
            Self::SendFailed(msg) => write!(f, "Send failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Inbound message sequence handed out by [`Transport::receive`].
///
/// Yields messages in the order the peer produced them and returns `None`
/// once the transport is disconnected or the peer goes away.
#[derive(Debug)]
pub struct Inbound {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Inbound {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self { rx }
    }

    /// Wait for the next message, returning `None` at end of stream.
    pub async fn next(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Take the next message if one is already waiting (non-blocking).
    pub fn try_next(&mut self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }
}

/// A bidirectional message channel.
///
/// Implementors take `&self` everywhere so a single instance can be shared
/// as `Arc<dyn Transport>` between a writer and a reader task.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Establish the connection. Calling this while connected is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectFailed` if the peer cannot be reached,
    /// or `TransportError::Closed` if this instance was already disconnected.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Release the underlying resources and end the inbound sequence.
    async fn disconnect(&self);

    /// Send one message to the peer.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotConnected` before `connect` completes,
    /// `TransportError::Closed` after `disconnect`, or
    /// `TransportError::SendFailed` if the write fails.
    async fn send(&self, message: Vec<u8>) -> Result<(), TransportError>;

    /// Take the inbound message sequence.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::AlreadyReceiving` on the second call.
    fn receive(&self) -> Result<Inbound, TransportError>;

    /// Current lifecycle state.
    fn state(&self) -> LinkState;
}

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
