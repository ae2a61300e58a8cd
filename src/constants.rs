//! Application-wide constants for godot-mcp.
//!
//! Grouped by domain.
//!
//! # Categories
//!
//! - **Editor link**: defaults for reaching the Godot editor plugin
//! - **Framing**: message size limits
//! - **MCP**: protocol identification

// ============================================================================
// Editor link
// ============================================================================

/// Default WebSocket URL of the Godot editor plugin.
///
/// The plugin listens on localhost port 9080 unless reconfigured in the
/// editor's project settings.
pub const DEFAULT_GODOT_URL: &str = "ws://127.0.0.1:9080";

/// Default time allowed for the WebSocket handshake with the editor, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

// ============================================================================
// Framing
// ============================================================================

/// Longest accepted line on the standard-stream transport (16 MiB).
///
/// Full scene trees of large projects run to a few megabytes; anything
/// beyond this is treated as a broken peer.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

// ============================================================================
// MCP
// ============================================================================

/// MCP protocol revision announced in `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Server name announced in `initialize`.
pub const SERVER_NAME: &str = "godot-mcp";

/// JSON-RPC: invalid params (also used for unknown resource URIs).
pub const JSONRPC_INVALID_PARAMS: i64 = -32602;

/// JSON-RPC: method not found.
pub const JSONRPC_METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC: internal error (editor call behind a resource failed).
pub const JSONRPC_INTERNAL_ERROR: i64 = -32603;
