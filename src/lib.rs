//! Godot MCP Bridge - MCP tool server for a running Godot editor.
//!
//! This crate exposes editor operations (scene nodes, scripts, project
//! files, debug output) as MCP tools and resources, and forwards each one as
//! a correlated command to the Godot editor plugin.
//!
//! # Architecture
//!
//! Requests flow from the MCP client through four layers:
//!
//! - **MCP server** - JSON-RPC session on stdio, answers protocol methods
//! - **Tools** - Registry of named tools; validates arguments, renders text
//! - **Provider** - Typed editor API; decodes loosely-typed editor replies
//! - **Multiplexer** - Assigns `cmd_N` ids and routes replies to callers
//!
//! Everything below the multiplexer is a [`transport::Transport`]: stdio,
//! WebSocket, or an in-process pair for tests.
//!
//! # Modules
//!
//! - [`mcp_serve`] - MCP JSON-RPC session handling
//! - [`tools`] - Tool registry, catalog and dispatcher
//! - [`resources`] - Read-only editor snapshots
//! - [`provider`] - Editor provider trait, remote and offline providers
//! - [`protocol`] - Editor wire envelopes
//! - [`scene`] - Scene, node and property types
//! - [`transport`] - Message transports
//! - [`config`] - Configuration loading/saving

// Library modules
pub mod mcp_serve;
pub mod protocol;
pub mod provider;
pub mod resources;
pub mod scene;
pub mod tools;
pub mod transport;

pub mod config;
pub mod constants;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use mcp_serve::McpServer;
pub use provider::{CommandMultiplexer, EditorProvider, OfflineProvider, ProviderError, RemoteProvider};
pub use tools::{Dispatcher, ToolRegistry, ToolResult};
pub use transport::{MemoryTransport, StdioTransport, Transport, WebSocketTransport};
