//! Request/response correlation over a shared transport.
//!
//! Every editor command is one frame out and one frame back. The multiplexer
//! turns that into an awaitable call:
//!
//! ```text
//! call("create_node", params)
//!   ├─ lock table ── assign cmd_N ── send now (Ready) or queue (Idle/Connecting)
//!   ├─ register PendingCall { waiter: oneshot::Sender }
//!   └─ await waiter ◄── pump: decode envelope ── remove entry ── resolve
//! ```
//!
//! # Link lifecycle
//!
//! ```text
//! Idle ──first call / connect()──► Connecting ──ok──► Ready ──inbound ends / disconnect()──► Closed
//!  ▲                                   │
//!  └────────── connect failed ─────────┘  (queued calls fail, a later call may retry)
//! ```
//!
//! The counter, pending table, outgoing queue, and link state share one
//! `tokio::sync::Mutex`. Immediate sends happen while it is held, so wire
//! order always equals identifier order.
//!
//! There is no per-call timeout: a call waits until its response arrives or
//! the link is lost. A caller may give up by dropping its `call` future; the
//! entry it leaves behind is pruned on the next call, and a late reply to it
//! counts as stale.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{oneshot, watch, Mutex};

use super::ProviderError;
use crate::protocol::{CommandFrame, ResponseEnvelope};
use crate::transport::{Inbound, Transport, TransportError};

type Outcome = Result<Map<String, Value>, ProviderError>;

/// Link state as seen by the multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Idle,
    Connecting,
    Ready,
    Closed,
}

/// One in-flight command.
#[derive(Debug)]
struct PendingCall {
    command: String,
    issued: Vec<u8>,
    waiter: oneshot::Sender<Outcome>,
}

#[derive(Debug)]
struct CallTable {
    next_command: u64,
    pending: HashMap<String, PendingCall>,
    /// Frames issued before the link was ready, in issue order.
    outgoing: VecDeque<Vec<u8>>,
    link: Link,
    last_connect_error: Option<TransportError>,
}

impl CallTable {
    fn fail_all(&mut self, error: &ProviderError) {
        self.outgoing.clear();
        for (command_id, call) in self.pending.drain() {
            log::debug!(
                "[Mux] Failing {} ({}, {} bytes): {}",
                command_id,
                call.command,
                call.issued.len(),
                error
            );
            // Caller may have given up; nothing to do then.
            let _ = call.waiter.send(Err(error.clone()));
        }
    }
}

#[derive(Debug)]
struct Shared {
    transport: Arc<dyn Transport>,
    table: Mutex<CallTable>,
    link_tx: watch::Sender<Link>,
    dropped_frames: AtomicU64,
    stale_responses: AtomicU64,
}

impl Shared {
    fn set_link(&self, table: &mut CallTable, link: Link) {
        table.link = link;
        self.link_tx.send_replace(link);
    }

    /// Connect the transport, flush queued frames, then start the read pump.
    async fn establish(self: Arc<Self>) {
        let linked = match self.transport.connect().await {
            Ok(()) => self.transport.receive(),
            Err(e) => Err(e),
        };

        let mut table = self.table.lock().await;
        if table.link == Link::Closed {
            // disconnect() won the race; the transport may have come up after it.
            drop(table);
            self.transport.disconnect().await;
            return;
        }

        let inbound = match linked {
            Ok(inbound) => inbound,
            Err(e) => {
                log::warn!("[Mux] Connect failed: {e}");
                table.fail_all(&ProviderError::Transport(e.clone()));
                table.last_connect_error = Some(e);
                self.set_link(&mut table, Link::Idle);
                return;
            }
        };

        let queued = table.outgoing.len();
        while let Some(frame) = table.outgoing.pop_front() {
            if let Err(e) = self.transport.send(frame).await {
                log::error!("[Mux] Failed to flush queued command: {e}");
                table.fail_all(&ProviderError::Transport(e));
                self.set_link(&mut table, Link::Closed);
                drop(table);
                self.transport.disconnect().await;
                return;
            }
        }
        table.last_connect_error = None;
        self.set_link(&mut table, Link::Ready);
        drop(table);

        log::info!("[Mux] Editor link ready ({queued} queued commands flushed)");
        tokio::spawn(Arc::clone(&self).pump(inbound));
    }

    async fn pump(self: Arc<Self>, mut inbound: Inbound) {
        while let Some(frame) = inbound.next().await {
            self.route(&frame).await;
        }
        log::info!("[Mux] Editor link closed");
        self.close().await;
    }

    /// Resolve the call a response frame belongs to.
    async fn route(&self, frame: &[u8]) {
        let envelope = match ResponseEnvelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                log::warn!("[Mux] Dropping malformed frame ({} bytes): {e}", frame.len());
                return;
            }
        };

        // Remove before resolving: a duplicate response finds nothing.
        let entry = self.table.lock().await.pending.remove(&envelope.command_id);
        let Some(call) = entry else {
            self.stale_responses.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "[Mux] Dropping response for unknown command {}",
                envelope.command_id
            );
            return;
        };

        log::debug!("[Mux] {} ({}) -> {:?}", envelope.command_id, call.command, envelope.status);
        if call.waiter.send(envelope.into_result()).is_err() {
            log::debug!("[Mux] Caller for {} went away", call.command);
        }
    }

    /// Fail every pending call and refuse new ones.
    async fn close(&self) {
        let mut table = self.table.lock().await;
        if table.link == Link::Closed {
            return;
        }
        if !table.pending.is_empty() {
            log::warn!("[Mux] Link lost with {} pending commands", table.pending.len());
        }
        table.fail_all(&ProviderError::ConnectionLost);
        self.set_link(&mut table, Link::Closed);
    }
}

/// Snapshot of anomaly counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MultiplexerStats {
    /// Inbound frames that did not decode as a response envelope.
    pub dropped_frames: u64,
    /// Responses whose `commandId` matched no pending call.
    pub stale_responses: u64,
}

/// Correlates editor commands with their responses over one transport.
///
/// Cheap to clone; clones share the same link and table.
#[derive(Debug, Clone)]
pub struct CommandMultiplexer {
    shared: Arc<Shared>,
}

impl CommandMultiplexer {
    /// Wrap a transport. Nothing connects until the first call or [`connect`](Self::connect).
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (link_tx, _) = watch::channel(Link::Idle);
        Self {
            shared: Arc::new(Shared {
                transport,
                table: Mutex::new(CallTable {
                    next_command: 0,
                    pending: HashMap::new(),
                    outgoing: VecDeque::new(),
                    link: Link::Idle,
                    last_connect_error: None,
                }),
                link_tx,
                dropped_frames: AtomicU64::new(0),
                stale_responses: AtomicU64::new(0),
            }),
        }
    }

    /// Send `command` and wait for its result object.
    ///
    /// Connects lazily on the first call. Calls made while connecting are
    /// queued and sent, in order, once the link is up.
    pub async fn call(&self, command: &str, params: Map<String, Value>) -> Outcome {
        let waiter = {
            let mut table = self.shared.table.lock().await;
            if table.link == Link::Closed {
                return Err(ProviderError::ConnectionLost);
            }

            let command_id = format!("cmd_{}", table.next_command);
            table.next_command += 1;
            let frame = CommandFrame {
                command,
                command_id: &command_id,
                params: &params,
            }
            .encode()
            .map_err(|e| ProviderError::Transport(TransportError::SendFailed(e.to_string())))?;

            match table.link {
                Link::Ready => {
                    log::debug!("[Mux] -> {command_id} {command}");
                    self.shared.transport.send(frame.clone()).await?;
                }
                Link::Idle => {
                    table.outgoing.push_back(frame.clone());
                    self.shared.set_link(&mut table, Link::Connecting);
                    tokio::spawn(Arc::clone(&self.shared).establish());
                }
                Link::Connecting => table.outgoing.push_back(frame.clone()),
                Link::Closed => return Err(ProviderError::ConnectionLost),
            }

            // Callers that dropped their future leave a closed waiter behind.
            let before = table.pending.len();
            table.pending.retain(|_, call| !call.waiter.is_closed());
            let abandoned = before - table.pending.len();
            if abandoned > 0 {
                log::debug!("[Mux] Pruned {abandoned} abandoned calls");
            }

            let (tx, rx) = oneshot::channel();
            table.pending.insert(
                command_id,
                PendingCall {
                    command: command.to_string(),
                    issued: frame,
                    waiter: tx,
                },
            );
            rx
        };

        waiter.await.unwrap_or(Err(ProviderError::ConnectionLost))
    }

    /// Bring the link up without issuing a command.
    pub async fn connect(&self) -> Result<(), ProviderError> {
        let mut link = self.shared.link_tx.subscribe();
        {
            let mut table = self.shared.table.lock().await;
            match table.link {
                Link::Ready => return Ok(()),
                Link::Closed => return Err(ProviderError::ConnectionLost),
                Link::Connecting => {}
                Link::Idle => {
                    self.shared.set_link(&mut table, Link::Connecting);
                    tokio::spawn(Arc::clone(&self.shared).establish());
                }
            }
        }

        let settled = link
            .wait_for(|state| *state != Link::Connecting)
            .await
            .map(|state| *state)
            .map_err(|_closed| ProviderError::ConnectionLost)?;
        match settled {
            Link::Ready => Ok(()),
            Link::Idle => {
                let error = self.shared.table.lock().await.last_connect_error.clone();
                Err(error.map_or(ProviderError::ConnectionLost, ProviderError::Transport))
            }
            Link::Connecting | Link::Closed => Err(ProviderError::ConnectionLost),
        }
    }

    /// Fail all pending calls, close the link, and refuse further calls.
    pub async fn disconnect(&self) {
        self.shared.close().await;
        self.shared.transport.disconnect().await;
    }

    /// Anomaly counters.
    pub fn stats(&self) -> MultiplexerStats {
        MultiplexerStats {
            dropped_frames: self.shared.dropped_frames.load(Ordering::Relaxed),
            stale_responses: self.shared.stale_responses.load(Ordering::Relaxed),
        }
    }

    /// Number of calls waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.shared.table.lock().await.pending.len()
    }

    /// True once the link has been closed for good.
    pub fn is_closed(&self) -> bool {
        *self.shared.link_tx.borrow() == Link::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use rand::Rng;
    use serde_json::json;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    use crate::transport::{LinkState, MemoryTransport};

    const WAIT: Duration = Duration::from_secs(5);

    /// Editor end of a memory pair, driven by hand.
    struct Editor {
        transport: MemoryTransport,
        inbound: Inbound,
    }

    impl Editor {
        async fn new(transport: MemoryTransport) -> Self {
            transport.connect().await.unwrap();
            let inbound = transport.receive().unwrap();
            Self { transport, inbound }
        }

        async fn next_command(&mut self) -> Value {
            let bytes = timeout(WAIT, self.inbound.next()).await.unwrap().unwrap();
            serde_json::from_slice(&bytes).unwrap()
        }

        async fn reply(&self, envelope: &ResponseEnvelope) {
            self.send_raw(envelope.encode().unwrap()).await;
        }

        async fn send_raw(&self, bytes: Vec<u8>) {
            self.transport.send(bytes).await.unwrap();
        }
    }

    fn setup() -> (CommandMultiplexer, MemoryTransport) {
        let (ours, theirs) = MemoryTransport::pair();
        (CommandMultiplexer::new(Arc::new(ours)), theirs)
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn wait_for_pending(mux: &CommandMultiplexer, n: usize) {
        timeout(WAIT, async {
            while mux.pending_count().await < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    /// Memory transport whose `connect` blocks until released.
    #[derive(Debug)]
    struct GatedTransport {
        inner: MemoryTransport,
        gate: Notify,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            self.gate.notified().await;
            self.inner.connect().await
        }
        async fn disconnect(&self) {
            self.inner.disconnect().await;
        }
        async fn send(&self, message: Vec<u8>) -> Result<(), TransportError> {
            self.inner.send(message).await
        }
        fn receive(&self) -> Result<Inbound, TransportError> {
            self.inner.receive()
        }
        fn state(&self) -> LinkState {
            self.inner.state()
        }
    }

    /// Memory transport whose first `failures` connects are refused.
    #[derive(Debug)]
    struct FlakyTransport {
        inner: MemoryTransport,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(TransportError::ConnectFailed("connection refused".into()));
            }
            self.inner.connect().await
        }
        async fn disconnect(&self) {
            self.inner.disconnect().await;
        }
        async fn send(&self, message: Vec<u8>) -> Result<(), TransportError> {
            self.inner.send(message).await
        }
        fn receive(&self) -> Result<Inbound, TransportError> {
            self.inner.receive()
        }
        fn state(&self) -> LinkState {
            self.inner.state()
        }
    }

    #[tokio::test]
    async fn test_first_call_connects_and_resolves() {
        let (mux, theirs) = setup();
        let mut editor = Editor::new(theirs).await;

        let call = tokio::spawn({
            let mux = mux.clone();
            async move {
                mux.call(
                    "create_node",
                    params(json!({"parent_path": "/root", "node_type": "Label", "node_name": "Hi"})),
                )
                .await
            }
        });

        let frame = editor.next_command().await;
        assert_eq!(frame["type"], "create_node");
        assert_eq!(frame["commandId"], "cmd_0");
        assert_eq!(frame["params"]["node_name"], "Hi");
        editor
            .reply(&ResponseEnvelope::success("cmd_0", json!({"node_path": "/root/Hi"})))
            .await;

        let result = timeout(WAIT, call).await.unwrap().unwrap().unwrap();
        assert_eq!(result["node_path"], "/root/Hi");
        assert_eq!(mux.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_remote_error_carries_message() {
        let (mux, theirs) = setup();
        let mut editor = Editor::new(theirs).await;

        let first = tokio::spawn({
            let mux = mux.clone();
            async move { mux.call("get_debug_output", Map::new()).await }
        });
        let frame = editor.next_command().await;
        assert_eq!(frame["commandId"], "cmd_0");
        editor
            .reply(&ResponseEnvelope::success("cmd_0", json!({"output": ""})))
            .await;
        timeout(WAIT, first).await.unwrap().unwrap().unwrap();

        let second = tokio::spawn({
            let mux = mux.clone();
            async move {
                mux.call("get_node_properties", params(json!({"node_path": "/root/Player"})))
                    .await
            }
        });
        let frame = editor.next_command().await;
        assert_eq!(frame["commandId"], "cmd_1");
        editor
            .reply(&ResponseEnvelope::failure("cmd_1", "No node found at '/root/Player'"))
            .await;

        let err = timeout(WAIT, second).await.unwrap().unwrap().unwrap_err();
        assert_eq!(err, ProviderError::Remote("No node found at '/root/Player'".into()));
    }

    #[tokio::test]
    async fn test_calls_before_connect_are_flushed_in_issue_order() {
        let (ours, theirs) = MemoryTransport::pair();
        let gated = Arc::new(GatedTransport {
            inner: ours,
            gate: Notify::new(),
        });
        let mux = CommandMultiplexer::new(Arc::clone(&gated) as Arc<dyn Transport>);
        let mut editor = Editor::new(theirs).await;

        let mut calls = Vec::new();
        for i in 0..10 {
            let mux_ref = mux.clone();
            calls.push(tokio::spawn(async move {
                mux_ref.call("list_nodes", params(json!({"index": i}))).await
            }));
            wait_for_pending(&mux, i + 1).await;
        }
        assert!(editor.inbound.try_next().is_none());

        gated.gate.notify_one();

        let mut frames = Vec::new();
        for i in 0..10 {
            let frame = editor.next_command().await;
            assert_eq!(frame["commandId"], format!("cmd_{i}"));
            assert_eq!(frame["params"]["index"], i);
            frames.push(frame);
        }

        // Answer in reverse; each caller still gets its own result.
        for frame in frames.iter().rev() {
            let id = frame["commandId"].as_str().unwrap();
            editor
                .reply(&ResponseEnvelope::success(id, json!({"index": frame["params"]["index"]})))
                .await;
        }
        for (i, call) in calls.into_iter().enumerate() {
            let result = timeout(WAIT, call).await.unwrap().unwrap().unwrap();
            assert_eq!(result["index"], i);
        }
    }

    #[tokio::test]
    async fn test_concurrent_calls_get_unique_identifiers() {
        let (mux, theirs) = setup();
        let mut editor = Editor::new(theirs).await;
        let mut rng = rand::rng();
        let delays: Vec<u64> = (0..64).map(|_| rng.random_range(0..5)).collect();

        let mut calls = Vec::new();
        for (n, delay) in delays.into_iter().enumerate() {
            let mux = mux.clone();
            calls.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                mux.call("get_node_properties", params(json!({"n": n}))).await
            }));
        }

        let mut seen = HashSet::new();
        for _ in 0..64 {
            let frame = editor.next_command().await;
            let id = frame["commandId"].as_str().unwrap().to_string();
            assert!(seen.insert(id.clone()), "duplicate identifier {id}");
            editor
                .reply(&ResponseEnvelope::success(id, json!({"n": frame["params"]["n"]})))
                .await;
        }

        for (n, call) in calls.into_iter().enumerate() {
            let result = timeout(WAIT, call).await.unwrap().unwrap().unwrap();
            assert_eq!(result["n"], n);
        }
        assert_eq!(seen.len(), 64);
    }

    #[tokio::test]
    async fn test_stale_and_malformed_frames_are_dropped() {
        let (mux, theirs) = setup();
        let mut editor = Editor::new(theirs).await;

        let call = tokio::spawn({
            let mux = mux.clone();
            async move { mux.call("get_selected_node", Map::new()).await }
        });
        editor.next_command().await;

        editor.send_raw(b"this is not json".to_vec()).await;
        editor.send_raw(br#"{"status":"success","result":{}}"#.to_vec()).await;
        editor
            .reply(&ResponseEnvelope::success("cmd_41", json!({"selected": false})))
            .await;
        editor
            .reply(&ResponseEnvelope::success("cmd_0", json!({"selected": false})))
            .await;
        // Duplicate of an already-resolved response.
        editor
            .reply(&ResponseEnvelope::success("cmd_0", json!({"selected": true})))
            .await;

        let result = timeout(WAIT, call).await.unwrap().unwrap().unwrap();
        assert_eq!(result["selected"], false);

        timeout(WAIT, async {
            while mux.stats().stale_responses < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(
            mux.stats(),
            MultiplexerStats {
                dropped_frames: 2,
                stale_responses: 2
            }
        );
    }

    #[tokio::test]
    async fn test_success_without_result_is_malformed_for_that_call() {
        let (mux, theirs) = setup();
        let mut editor = Editor::new(theirs).await;

        let call = tokio::spawn({
            let mux = mux.clone();
            async move { mux.call("delete_node", Map::new()).await }
        });
        editor.next_command().await;
        editor
            .send_raw(br#"{"commandId":"cmd_0","status":"success"}"#.to_vec())
            .await;

        let err = timeout(WAIT, call).await.unwrap().unwrap().unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_disconnect_resolves_every_pending_call() {
        let (mux, theirs) = setup();
        let _editor = Editor::new(theirs).await;

        let calls: Vec<_> = (0..5)
            .map(|i| {
                let mux = mux.clone();
                tokio::spawn(async move { mux.call("get_script", params(json!({"i": i}))).await })
            })
            .collect();
        wait_for_pending(&mux, 5).await;

        mux.disconnect().await;

        for call in calls {
            let err = timeout(WAIT, call).await.unwrap().unwrap().unwrap_err();
            assert_eq!(err, ProviderError::ConnectionLost);
        }
        assert_eq!(mux.pending_count().await, 0);
        assert!(mux.is_closed());
        assert_eq!(
            mux.call("get_script", Map::new()).await,
            Err(ProviderError::ConnectionLost)
        );
    }

    #[tokio::test]
    async fn test_abandoned_call_is_pruned_and_its_reply_is_stale() {
        let (mux, theirs) = setup();
        let mut editor = Editor::new(theirs).await;

        let abandoned = tokio::spawn({
            let mux = mux.clone();
            async move { mux.call("get_debug_output", Map::new()).await }
        });
        let first = editor.next_command().await;
        wait_for_pending(&mux, 1).await;
        abandoned.abort();
        assert!(abandoned.await.unwrap_err().is_cancelled());

        let live = tokio::spawn({
            let mux = mux.clone();
            async move { mux.call("get_script", Map::new()).await }
        });
        let second = editor.next_command().await;
        assert_eq!(mux.pending_count().await, 1);

        let first_id = first["commandId"].as_str().unwrap();
        let second_id = second["commandId"].as_str().unwrap();
        editor
            .reply(&ResponseEnvelope::success(first_id, json!({"output": "late"})))
            .await;
        editor
            .reply(&ResponseEnvelope::success(second_id, json!({"content": "extends Node"})))
            .await;

        let result = timeout(WAIT, live).await.unwrap().unwrap().unwrap();
        assert_eq!(result["content"], "extends Node");
        assert_eq!(mux.stats().stale_responses, 1);
        assert_eq!(mux.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_peer_going_away_fails_pending_calls() {
        let (mux, theirs) = setup();
        let mut editor = Editor::new(theirs).await;

        let call = tokio::spawn({
            let mux = mux.clone();
            async move { mux.call("get_full_scene_tree", Map::new()).await }
        });
        editor.next_command().await;
        editor.transport.disconnect().await;

        let err = timeout(WAIT, call).await.unwrap().unwrap().unwrap_err();
        assert_eq!(err, ProviderError::ConnectionLost);
    }

    #[tokio::test]
    async fn test_failed_connect_fails_queued_calls_then_retries() {
        let (ours, theirs) = MemoryTransport::pair();
        let flaky = FlakyTransport {
            inner: ours,
            failures: AtomicUsize::new(1),
        };
        let mux = CommandMultiplexer::new(Arc::new(flaky));
        let mut editor = Editor::new(theirs).await;

        let err = timeout(WAIT, mux.call("get_debug_output", Map::new()))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Transport(TransportError::ConnectFailed(_))
        ));
        assert_eq!(mux.pending_count().await, 0);
        assert!(editor.inbound.try_next().is_none());

        let call = tokio::spawn({
            let mux = mux.clone();
            async move { mux.call("get_debug_output", Map::new()).await }
        });
        let frame = editor.next_command().await;
        assert_eq!(frame["commandId"], "cmd_1");
        editor
            .reply(&ResponseEnvelope::success("cmd_1", json!({"output": "ok"})))
            .await;
        let result = timeout(WAIT, call).await.unwrap().unwrap().unwrap();
        assert_eq!(result["output"], "ok");
    }

    #[tokio::test]
    async fn test_explicit_connect_reports_failure_and_success() {
        let (ours, theirs) = MemoryTransport::pair();
        let flaky = FlakyTransport {
            inner: ours,
            failures: AtomicUsize::new(1),
        };
        let mux = CommandMultiplexer::new(Arc::new(flaky));
        let mut editor = Editor::new(theirs).await;

        let err = timeout(WAIT, mux.connect()).await.unwrap().unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));

        timeout(WAIT, mux.connect()).await.unwrap().unwrap();
        timeout(WAIT, mux.connect()).await.unwrap().unwrap();
        assert!(editor.inbound.try_next().is_none());
    }
}
