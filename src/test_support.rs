//! Scripted fake editor for unit tests.

use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::protocol::ResponseEnvelope;
use crate::transport::{MemoryTransport, Transport};

/// How the fake editor answers one command.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// `status: success` with this result.
    Ok(Value),
    /// `status: error` with this message.
    Err(String),
}

/// Upper bound on any single editor round trip in tests.
pub(crate) const WAIT: Duration = Duration::from_secs(5);

/// Await `call`, failing the test instead of hanging when the fake editor
/// never answers (for example because a handler assertion panicked).
pub(crate) async fn within<F: Future>(call: F) -> F::Output {
    tokio::time::timeout(WAIT, call)
        .await
        .expect("editor did not answer in time; check the handler's assertions")
}

/// Answer every command arriving on `transport` with `handler`.
pub(crate) fn spawn_editor(
    transport: MemoryTransport,
    handler: impl Fn(&str, &Map<String, Value>) -> Reply + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        transport.connect().await.unwrap();
        let mut inbound = transport.receive().unwrap();
        while let Some(bytes) = inbound.next().await {
            let frame: Value = serde_json::from_slice(&bytes).unwrap();
            let command = frame["type"].as_str().unwrap_or_default();
            let command_id = frame["commandId"].as_str().unwrap_or_default();
            let params = frame["params"].as_object().cloned().unwrap_or_default();
            let envelope = match handler(command, &params) {
                Reply::Ok(result) => ResponseEnvelope::success(command_id, result),
                Reply::Err(message) => ResponseEnvelope::failure(command_id, message),
            };
            if transport.send(envelope.encode().unwrap()).await.is_err() {
                break;
            }
        }
    })
}
