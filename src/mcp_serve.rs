//! MCP JSON-RPC server.
//!
//! Reads JSON-RPC 2.0 messages from a [`Transport`] (stdin/stdout when
//! launched by an MCP client), answers protocol methods inline, and runs
//! each `tools/call` / `resources/read` as its own task so a slow editor
//! call never blocks the session.
//!
//! ```text
//! inbound ──► handle() ──┬─ initialize / ping / tools/list / resources/list ─┐
//!                        └─ spawn: Dispatcher::dispatch / resources::read ───┴─► outbound writer task
//! ```
//!
//! Launched by an MCP client as: `godot-mcp serve`

// Rust guideline compliant 2026-02

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::constants::{
    JSONRPC_INTERNAL_ERROR, JSONRPC_INVALID_PARAMS, JSONRPC_METHOD_NOT_FOUND, MCP_PROTOCOL_VERSION,
    SERVER_NAME,
};
use crate::provider;
use crate::resources::{self, ResourceError, JSON_MIME};
use crate::tools::{Dispatcher, ToolRegistry};
use crate::transport::{StdioTransport, Transport};

/// Run the MCP server on stdio, blocking on a tokio runtime.
pub fn run(config: &Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_async(config).await })
}

async fn run_async(config: &Config) -> Result<()> {
    let registry = Arc::new(ToolRegistry::standard()?);
    let dispatcher = Dispatcher::new(registry, provider::from_config(config));
    let server = McpServer::new(dispatcher.clone());

    let result = server.serve(Arc::new(StdioTransport::new())).await;
    dispatcher.shutdown().await;
    result
}

fn response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

/// One MCP session's request handling.
#[derive(Debug, Clone)]
pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Server answering with `dispatcher`'s tools.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serve until the inbound sequence ends, then wait for in-flight calls.
    pub async fn serve(&self, transport: Arc<dyn Transport>) -> Result<()> {
        transport
            .connect()
            .await
            .context("Failed to open MCP transport")?;
        let mut inbound = transport
            .receive()
            .context("Failed to read from MCP transport")?;

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
        let writer = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                while let Some(message) = out_rx.recv().await {
                    let bytes = match serde_json::to_vec(&message) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            log::error!("[Mcp] Failed to encode response: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = transport.send(bytes).await {
                        log::error!("[Mcp] Failed to write response: {e}");
                        break;
                    }
                }
            }
        });

        log::info!("[Mcp] Session started");
        let mut in_flight = JoinSet::new();
        while let Some(bytes) = inbound.next().await {
            while in_flight.try_join_next().is_some() {}

            let message: Value = match serde_json::from_slice(&bytes) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("[Mcp] Invalid JSON from client: {e}");
                    continue;
                }
            };
            self.handle(message, &out_tx, &mut in_flight);
        }

        log::info!("[Mcp] Client closed the session, waiting for {} calls", in_flight.len());
        while in_flight.join_next().await.is_some() {}
        drop(out_tx);
        if let Err(e) = writer.await {
            log::warn!("[Mcp] Writer task failed: {e}");
        }
        Ok(())
    }

    fn handle(&self, message: Value, out: &mpsc::UnboundedSender<Value>, in_flight: &mut JoinSet<()>) {
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let id = message.get("id").cloned();
        let params = message.get("params").cloned().unwrap_or_else(|| json!({}));

        // Notifications and stray responses carry no id and get no answer.
        let Some(id) = id else {
            log::debug!("[Mcp] Notification: {method}");
            return;
        };

        let reply = match method {
            "initialize" => response(
                id,
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": { "listChanged": true },
                        "resources": { "listChanged": true }
                    },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),

            "ping" => response(id, json!({})),

            "tools/list" => response(id, json!({ "tools": self.dispatcher.registry().listing() })),

            "tools/call" => {
                let Some(name) = params.get("name").and_then(Value::as_str).map(str::to_string) else {
                    self.send(out, error_response(id, JSONRPC_INVALID_PARAMS, "Missing tool name"));
                    return;
                };
                let arguments = match params.get("arguments") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(map)) => map.clone(),
                    Some(_) => {
                        self.send(
                            out,
                            error_response(id, JSONRPC_INVALID_PARAMS, "Tool arguments must be an object"),
                        );
                        return;
                    }
                };

                let dispatcher = self.dispatcher.clone();
                let out = out.clone();
                in_flight.spawn(async move {
                    log::info!("[Mcp] tools/call {name}");
                    let result = dispatcher.dispatch(&name, arguments).await;
                    if out.send(response(id, result.to_mcp())).is_err() {
                        log::debug!("[Mcp] Session gone before {name} finished");
                    }
                });
                return;
            }

            "resources/list" => response(id, json!({ "resources": resources::list() })),

            "resources/read" => {
                let Some(uri) = params.get("uri").and_then(Value::as_str).map(str::to_string) else {
                    self.send(out, error_response(id, JSONRPC_INVALID_PARAMS, "Missing resource URI"));
                    return;
                };

                let provider = Arc::clone(self.dispatcher.provider());
                let out = out.clone();
                in_flight.spawn(async move {
                    let reply = match resources::read(provider.as_ref(), &uri).await {
                        Ok(text) => response(
                            id,
                            json!({ "contents": [{ "uri": uri, "mimeType": JSON_MIME, "text": text }] }),
                        ),
                        Err(e @ ResourceError::UnknownUri(_)) => {
                            error_response(id, JSONRPC_INVALID_PARAMS, &e.to_string())
                        }
                        Err(e) => {
                            log::warn!("[Mcp] resources/read {uri} failed: {e}");
                            error_response(id, JSONRPC_INTERNAL_ERROR, &e.to_string())
                        }
                    };
                    if out.send(reply).is_err() {
                        log::debug!("[Mcp] Session gone before resource read finished");
                    }
                });
                return;
            }

            _ if method.is_empty() => {
                // A response to something we never asked; ignore.
                return;
            }

            _ => error_response(id, JSONRPC_METHOD_NOT_FOUND, &format!("Method not found: {method}")),
        };

        self.send(out, reply);
    }

    fn send(&self, out: &mpsc::UnboundedSender<Value>, message: Value) {
        if out.send(message).is_err() {
            log::warn!("[Mcp] Outbound channel closed");
        }
    }
}
