//! Editor wire protocol.
//!
//! Requests and responses are single JSON objects, one per transport message:
//!
//! ```text
//! → { "type": "create_node", "commandId": "cmd_0", "params": { ... } }
//! ← { "commandId": "cmd_0", "status": "success", "result": { ... } }
//! ← { "commandId": "cmd_0", "status": "error", "message": "No node found" }
//! ```
//!
//! `commandId` is echoed verbatim and is the only correlation key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::provider::ProviderError;

/// Outbound command frame.
#[derive(Debug, Serialize)]
pub struct CommandFrame<'a> {
    /// Command name understood by the editor plugin.
    #[serde(rename = "type")]
    pub command: &'a str,
    /// Correlation identifier.
    #[serde(rename = "commandId")]
    pub command_id: &'a str,
    /// Command arguments.
    pub params: &'a Map<String, Value>,
}

impl CommandFrame<'_> {
    /// Serialize to the bytes sent on the wire.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Outcome reported by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The command ran; `result` carries its output.
    Success,
    /// The command failed; `message` explains why.
    Error,
}

/// Decoded response frame, before any typed decoding of `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Correlation identifier copied from the request.
    #[serde(rename = "commandId")]
    pub command_id: String,
    /// Success or error.
    pub status: ResponseStatus,
    /// Result object on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error description on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl ResponseEnvelope {
    /// Parse one inbound frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Build a success envelope. Used by fake editors.
    pub fn success(command_id: impl Into<String>, result: Value) -> Self {
        Self {
            command_id: command_id.into(),
            status: ResponseStatus::Success,
            result: Some(result),
            message: None,
        }
    }

    /// Build an error envelope. Used by fake editors.
    pub fn failure(command_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            status: ResponseStatus::Error,
            result: None,
            message: Some(Value::String(message.into())),
        }
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Resolve the envelope into the call's outcome.
    ///
    /// An error without a string `message`, or a success without an object
    /// `result`, is a malformed response for that call.
    pub fn into_result(self) -> Result<Map<String, Value>, ProviderError> {
        match self.status {
            ResponseStatus::Error => match self.message {
                Some(Value::String(message)) => Err(ProviderError::Remote(message)),
                _ => Err(ProviderError::MalformedResponse(
                    "Error response without a message".to_string(),
                )),
            },
            ResponseStatus::Success => match self.result {
                Some(Value::Object(result)) => Ok(result),
                _ => Err(ProviderError::MalformedResponse(
                    "Missing the result element in the response".to_string(),
                )),
            },
        }
    }
}
