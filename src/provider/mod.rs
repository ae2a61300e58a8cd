//! Editor provider: typed operations against a Godot editor.
//!
//! Tools never talk to the wire directly. They call an [`EditorProvider`],
//! which comes in two flavours:
//!
//! ```text
//! EditorProvider (trait)
//!     │
//!     ├── RemoteProvider   CommandMultiplexer over a Transport (WebSocket in production)
//!     └── OfflineProvider  no editor configured; every call fails with Unavailable
//! ```

pub mod decode;
pub mod multiplexer;
pub mod offline;
pub mod remote;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::scene::{NodeSummary, PropertyBag, SceneInfo, SceneNode, Transform2DUpdate};
use crate::transport::TransportError;

pub use multiplexer::{CommandMultiplexer, MultiplexerStats};
pub use offline::OfflineProvider;
pub use remote::RemoteProvider;

/// Errors returned by provider operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The transport could not connect or send.
    Transport(TransportError),
    /// The link went away while the call was in flight, or was already closed.
    ConnectionLost,
    /// The editor reported a failure.
    Remote(String),
    /// The response envelope had the wrong shape for its status.
    MalformedResponse(String),
    /// The `result` object lacked a required field or had the wrong shape.
    Response(String),
    /// No editor is configured.
    Unavailable,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Editor transport error: {e}"),
            Self::ConnectionLost => write!(f, "Connection to the Godot editor was lost"),
            Self::Remote(msg) => f.write_str(msg),
            Self::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
            Self::Response(msg) => write!(f, "Unexpected response: {msg}"),
            Self::Unavailable => write!(f, "No Godot editor connection is configured"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for ProviderError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Typed operations on a running Godot editor.
///
/// Shared as `Arc<dyn EditorProvider>` between concurrently running tool calls.
#[async_trait]
pub trait EditorProvider: Send + Sync + std::fmt::Debug {
    /// Create a node of `node_type` named `node_name` under `parent_path`.
    /// Returns the new node's path.
    async fn create_node(
        &self,
        parent_path: &str,
        node_type: &str,
        node_name: &str,
    ) -> Result<String, ProviderError>;

    /// Delete a node. Returns the deleted node's path.
    async fn delete_node(&self, node_path: &str) -> Result<String, ProviderError>;

    /// Set `property` on a node. `value` is the editor-parseable text of the
    /// new value. Returns the value as the editor parsed it, rendered.
    async fn update_node_property(
        &self,
        node_path: &str,
        property: &str,
        value: &str,
    ) -> Result<String, ProviderError>;

    /// All properties of a node.
    async fn get_node_properties(&self, node_path: &str) -> Result<PropertyBag, ProviderError>;

    /// Direct children of a node.
    async fn list_nodes(&self, node_path: &str) -> Result<Vec<NodeSummary>, ProviderError>;

    /// Create a script file, optionally attaching it to a node.
    async fn create_script(
        &self,
        script_path: &str,
        content: &str,
        node_path: Option<&str>,
    ) -> Result<(), ProviderError>;

    /// Replace the content of an existing script.
    async fn edit_script(&self, script_path: &str, content: &str) -> Result<(), ProviderError>;

    /// Script source, by file path or by the node it is attached to.
    async fn get_script(
        &self,
        script_path: Option<&str>,
        node_path: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// Project files of an asset type (`images`, `audio`, `scripts`, ...).
    async fn list_assets(&self, asset_type: &str) -> Result<Vec<String>, ProviderError>;

    /// Project files with any of the given extensions. Empty means all files.
    async fn list_project_files(&self, extensions: &[String]) -> Result<Vec<String>, ProviderError>;

    /// Run GDScript in the editor and collect its printed output.
    async fn execute_editor_script(&self, code: &str) -> Result<Vec<String>, ProviderError>;

    /// The full tree of the edited scene.
    async fn get_scene_tree(&self) -> Result<SceneNode, ProviderError>;

    /// Editor debug log.
    async fn get_debug_output(&self) -> Result<String, ProviderError>;

    /// The open scene, or `None` when no scene is open.
    async fn get_current_scene_info(&self) -> Result<Option<SceneInfo>, ProviderError>;

    /// The selected node, or `None` when nothing is selected.
    async fn get_selected_node(&self) -> Result<Option<NodeSummary>, ProviderError>;

    /// Update position, rotation, and/or scale of a `Node2D`.
    async fn update_2d_transform(&self, update: &Transform2DUpdate) -> Result<(), ProviderError>;

    /// Release the editor link.
    async fn shutdown(&self) {}
}

/// Build the provider the configuration asks for.
pub fn from_config(config: &Config) -> Arc<dyn EditorProvider> {
    if config.offline {
        log::info!("[Provider] Offline mode, editor calls will fail");
        Arc::new(OfflineProvider)
    } else {
        log::info!("[Provider] Using Godot editor at {}", config.godot_url);
        Arc::new(RemoteProvider::websocket(
            &config.godot_url,
            Duration::from_secs(config.connect_timeout_secs),
        ))
    }
}
