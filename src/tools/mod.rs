//! Tool registry and dispatcher.
//!
//! A tool is a name, a description, a JSON input schema, annotations, and
//! a handler `(Arguments, Arc<dyn EditorProvider>) -> Result<String, ToolError>`.
//! The [`Dispatcher`] looks tools up by name and turns every outcome into a
//! [`ToolResult`]: one text payload plus an error flag. Nothing a tool does
//! can fail the MCP session itself.

pub mod args;
pub mod catalog;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::bail;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::provider::{EditorProvider, ProviderError};

pub use args::Arguments;

/// Future returned by a tool handler.
pub type ToolFuture = BoxFuture<'static, Result<String, ToolError>>;

/// Bound implementation of a tool.
pub type ToolHandler = Arc<dyn Fn(Arguments, Arc<dyn EditorProvider>) -> ToolFuture + Send + Sync>;

/// Errors a tool can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Missing or mistyped argument, detected before calling the editor.
    InvalidParams(String),
    /// The editor operation failed.
    Provider(ProviderError),
    /// The typed result could not be serialized.
    Encode(String),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams(msg) => write!(f, "Invalid parameters: {msg}"),
            Self::Provider(e) => write!(f, "{e}"),
            Self::Encode(msg) => write!(f, "Failed to encode result: {msg}"),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<ProviderError> for ToolError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

/// Serialize a typed result as stable, pretty-printed JSON.
///
/// Going through `Value` sorts every object's keys, so equal values always
/// produce identical text.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ToolError> {
    let value = serde_json::to_value(value).map_err(|e| ToolError::Encode(e.to_string()))?;
    serde_json::to_string_pretty(&value).map_err(|e| ToolError::Encode(e.to_string()))
}

/// MCP tool annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// Human-readable title.
    pub title: String,
    /// The tool does not modify the editor state.
    pub read_only_hint: bool,
    /// The tool may destroy or overwrite existing state.
    pub destructive_hint: bool,
    /// Repeating the call with the same arguments has no further effect.
    pub idempotent_hint: bool,
    /// The tool talks to an external system.
    pub open_world_hint: bool,
}

/// One registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: &'static str,
    /// What the tool does.
    pub description: &'static str,
    /// JSON Schema of the arguments object.
    pub input_schema: Value,
    /// MCP annotations.
    pub annotations: ToolAnnotations,
    /// Implementation.
    pub handler: ToolHandler,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    /// Entry for a `tools/list` response.
    pub fn to_listing(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
            "annotations": self.annotations,
        })
    }
}

/// Tools by name, in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the full Godot tool catalog.
    pub fn standard() -> anyhow::Result<Self> {
        let mut registry = Self::new();
        for tool in catalog::all() {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: ToolDescriptor) -> anyhow::Result<()> {
        if self.index.contains_key(tool.name) {
            bail!("tool '{}' is already registered", tool.name);
        }
        self.index.insert(tool.name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Look a tool up by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// `tools/list` entries.
    pub fn listing(&self) -> Vec<Value> {
        self.iter().map(ToolDescriptor::to_listing).collect()
    }
}

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Text payload.
    pub text: String,
    /// True when the call failed.
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Failed result.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// `tools/call` result object.
    pub fn to_mcp(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

/// Routes tool calls to their handlers against one shared provider.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    provider: Arc<dyn EditorProvider>,
}

impl Dispatcher {
    /// Dispatcher over `registry`, running tools against `provider`.
    pub fn new(registry: Arc<ToolRegistry>, provider: Arc<dyn EditorProvider>) -> Self {
        Self { registry, provider }
    }

    /// The tool registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The shared provider.
    pub fn provider(&self) -> &Arc<dyn EditorProvider> {
        &self.provider
    }

    /// Run tool `name`. Unknown tools and every failure come back as
    /// `is_error` results.
    pub async fn dispatch(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        let Some(tool) = self.registry.get(name) else {
            log::warn!("[Tools] Unknown tool: {name}");
            return ToolResult::error(format!("Unknown tool: {name}"));
        };

        let started = Instant::now();
        let outcome = (tool.handler)(Arguments::from(arguments), Arc::clone(&self.provider)).await;
        match outcome {
            Ok(text) => {
                log::debug!("[Tools] {name} ok in {:?}", started.elapsed());
                ToolResult::text(text)
            }
            Err(e) => {
                log::warn!("[Tools] {name} failed in {:?}: {e}", started.elapsed());
                ToolResult::error(e.to_string())
            }
        }
    }

    /// Release the provider's editor link.
    pub async fn shutdown(&self) {
        self.provider.shutdown().await;
    }
}
