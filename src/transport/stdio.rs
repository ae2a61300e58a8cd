//! Standard-stream transport.
//!
//! One message per line: inbound lines are split from stdin as raw bytes,
//! outbound messages are written to stdout followed by `\n`. This is how MCP
//! consumers talk to a server they launched as a child process. Blank lines
//! are skipped. A line that is not valid UTF-8 is still delivered (the JSON
//! layer rejects it); a line longer than [`MAX_MESSAGE_SIZE`] is discarded up
//! to the next newline. Neither ends the stream.
//!
//! The transport is generic over any `AsyncRead`/`AsyncWrite` pair so tests
//! can drive it through `tokio::io::duplex`.

use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, FramedRead};

use super::{lock, Inbound, LinkState, Transport, TransportError};
use crate::constants::MAX_MESSAGE_SIZE;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One frame read from the input.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    /// Bytes between two newlines, newline excluded.
    Message(Vec<u8>),
    /// A line over the length limit; its bytes are being discarded.
    Oversized,
}

/// Newline splitter that reports oversized lines as frames instead of
/// errors. `FramedRead` ends the stream after the first decoder error, so
/// the limit must not surface as one.
#[derive(Debug)]
struct LineSplitter {
    inner: AnyDelimiterCodec,
}

impl LineSplitter {
    fn new(max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), max_length),
        }
    }

    fn lift(
        frame: Result<Option<bytes::Bytes>, AnyDelimiterCodecError>,
    ) -> Result<Option<Line>, io::Error> {
        match frame {
            Ok(frame) => Ok(frame.map(|bytes| Line::Message(bytes.to_vec()))),
            Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => Ok(Some(Line::Oversized)),
            Err(AnyDelimiterCodecError::Io(e)) => Err(e),
        }
    }
}

impl Decoder for LineSplitter {
    type Item = Line;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Line>, io::Error> {
        Self::lift(self.inner.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Line>, io::Error> {
        Self::lift(self.inner.decode_eof(src))
    }
}

/// Line-delimited transport over a reader/writer pair (stdin/stdout by default).
pub struct StdioTransport {
    /// Read half, taken by `receive`.
    reader: Mutex<Option<BoxedReader>>,
    /// Write half.
    writer: tokio::sync::Mutex<BoxedWriter>,
    /// Task pumping lines into the inbound channel.
    pump: Mutex<Option<JoinHandle<()>>>,
    state: Mutex<LinkState>,
    max_line_length: usize,
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("state", &*lock(&self.state))
            .finish_non_exhaustive()
    }
}

impl StdioTransport {
    /// Transport over the process's stdin and stdout.
    pub fn new() -> Self {
        Self::from_streams(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Transport over an arbitrary reader/writer pair.
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Mutex::new(Some(Box::new(reader))),
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pump: Mutex::new(None),
            state: Mutex::new(LinkState::Idle),
            max_line_length: MAX_MESSAGE_SIZE,
        }
    }

    #[cfg(test)]
    fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Read loop: splits the input into lines and forwards non-empty ones.
    async fn pump_lines(reader: BoxedReader, max_line_length: usize, tx: mpsc::UnboundedSender<Vec<u8>>) {
        let mut lines = FramedRead::new(reader, LineSplitter::new(max_line_length));
        while let Some(line) = lines.next().await {
            match line {
                Ok(Line::Message(line)) if line.trim_ascii().is_empty() => {}
                Ok(Line::Message(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(Line::Oversized) => {
                    log::warn!("[Stdio] Dropping line longer than {max_line_length} bytes");
                }
                Err(e) => {
                    log::error!("[Stdio] Read error: {e}");
                    break;
                }
            }
        }
        log::info!("[Stdio] Input closed");
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        match *state {
            LinkState::Closed => Err(TransportError::Closed),
            LinkState::Idle | LinkState::Connected => {
                *state = LinkState::Connected;
                Ok(())
            }
        }
    }

    async fn disconnect(&self) {
        *lock(&self.state) = LinkState::Closed;
        if let Some(pump) = lock(&self.pump).take() {
            pump.abort();
        }
        // Never received: drop the reader so nothing holds stdin.
        lock(&self.reader).take();
        if let Err(e) = self.writer.lock().await.flush().await {
            log::debug!("[Stdio] Flush on disconnect failed: {e}");
        }
    }

    async fn send(&self, message: Vec<u8>) -> Result<(), TransportError> {
        match self.state() {
            LinkState::Idle => return Err(TransportError::NotConnected),
            LinkState::Closed => return Err(TransportError::Closed),
            LinkState::Connected => {}
        }
        let mut writer = self.writer.lock().await;
        let write = async {
            writer.write_all(&message).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        };
        write
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn receive(&self) -> Result<Inbound, TransportError> {
        if self.state() == LinkState::Closed {
            return Err(TransportError::Closed);
        }
        let reader = lock(&self.reader)
            .take()
            .ok_or(TransportError::AlreadyReceiving)?;
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.pump) = Some(tokio::spawn(Self::pump_lines(reader, self.max_line_length, tx)));
        Ok(Inbound::new(rx))
    }

    fn state(&self) -> LinkState {
        *lock(&self.state)
    }
}
