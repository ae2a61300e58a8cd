//! In-process mailbox transport.
//!
//! Two [`MemoryTransport`] ends share one mailbox with a lane per direction.
//! Messages sent before the other end has called [`Transport::receive`] are
//! held in the lane and handed over, in order, the moment a receiver
//! registers. This covers the race between "peer sends" and "peer starts
//! reading" without dropping anything.
//!
//! ```text
//! MemoryTransport (left)  ──► lane to_right ──►  MemoryTransport (right)
//!                         ◄── lane to_left  ◄──
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{lock, Inbound, LinkState, Transport, TransportError};

/// Which end of the pair a transport is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// One direction of the mailbox.
#[derive(Debug, Default)]
struct Lane {
    /// Messages waiting for a receiver to register.
    buffered: VecDeque<Vec<u8>>,
    /// Live receiver, once registered.
    receiver: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl Lane {
    fn deliver(&mut self, message: Vec<u8>) {
        match &self.receiver {
            Some(tx) => {
                if tx.send(message).is_err() {
                    log::debug!("[Memory] Receiver dropped, message discarded");
                }
            }
            None => self.buffered.push_back(message),
        }
    }

    fn register(&mut self) -> Inbound {
        let (tx, rx) = mpsc::unbounded_channel();
        for message in self.buffered.drain(..) {
            // Receiver is alive: we hold `rx` right here.
            let _ = tx.send(message);
        }
        self.receiver = Some(tx);
        Inbound::new(rx)
    }

    fn close(&mut self) {
        self.receiver = None;
        self.buffered.clear();
    }
}

/// Shared state behind both ends.
#[derive(Debug, Default)]
struct Mailbox {
    to_left: Lane,
    to_right: Lane,
    closed: bool,
}

impl Mailbox {
    fn outgoing(&mut self, from: Side) -> &mut Lane {
        match from {
            Side::Left => &mut self.to_right,
            Side::Right => &mut self.to_left,
        }
    }

    fn incoming(&mut self, at: Side) -> &mut Lane {
        match at {
            Side::Left => &mut self.to_left,
            Side::Right => &mut self.to_right,
        }
    }
}

/// One end of an in-process transport pair.
#[derive(Debug)]
pub struct MemoryTransport {
    mailbox: Arc<Mutex<Mailbox>>,
    side: Side,
    state: Mutex<LinkState>,
    receiving: AtomicBool,
}

impl MemoryTransport {
    /// Create two connected-to-each-other ends.
    pub fn pair() -> (Self, Self) {
        let mailbox = Arc::new(Mutex::new(Mailbox::default()));
        let left = Self::new(Arc::clone(&mailbox), Side::Left);
        let right = Self::new(mailbox, Side::Right);
        (left, right)
    }

    fn new(mailbox: Arc<Mutex<Mailbox>>, side: Side) -> Self {
        Self {
            mailbox,
            side,
            state: Mutex::new(LinkState::Idle),
            receiving: AtomicBool::new(false),
        }
    }

    /// Number of messages sent to this end that no receiver has taken yet.
    pub fn buffered_len(&self) -> usize {
        lock(&self.mailbox).incoming(self.side).buffered.len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if *state == LinkState::Closed || lock(&self.mailbox).closed {
            return Err(TransportError::Closed);
        }
        *state = LinkState::Connected;
        Ok(())
    }

    async fn disconnect(&self) {
        *lock(&self.state) = LinkState::Closed;
        let mut mailbox = lock(&self.mailbox);
        mailbox.closed = true;
        mailbox.to_left.close();
        mailbox.to_right.close();
    }

    async fn send(&self, message: Vec<u8>) -> Result<(), TransportError> {
        match *lock(&self.state) {
            LinkState::Idle => return Err(TransportError::NotConnected),
            LinkState::Closed => return Err(TransportError::Closed),
            LinkState::Connected => {}
        }
        let mut mailbox = lock(&self.mailbox);
        if mailbox.closed {
            return Err(TransportError::Closed);
        }
        mailbox.outgoing(self.side).deliver(message);
        Ok(())
    }

    fn receive(&self) -> Result<Inbound, TransportError> {
        if self.receiving.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyReceiving);
        }
        let mut mailbox = lock(&self.mailbox);
        if mailbox.closed {
            return Err(TransportError::Closed);
        }
        Ok(mailbox.incoming(self.side).register())
    }

    fn state(&self) -> LinkState {
        *lock(&self.state)
    }
}
