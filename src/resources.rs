//! Read-only editor snapshots exposed as MCP resources.
//!
//! Each resource is a fixed URI whose content is produced on demand by one
//! provider call and returned as canonical JSON.

use serde::Serialize;
use serde_json::{json, Value};

use crate::provider::{EditorProvider, ProviderError};
use crate::tools::canonical_json;

/// MIME type of every resource body.
pub const JSON_MIME: &str = "application/json";

/// A listed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Fixed URI.
    pub uri: &'static str,
    /// Short name.
    pub name: &'static str,
    /// What the snapshot contains.
    pub description: &'static str,
    /// Always [`JSON_MIME`].
    pub mime_type: &'static str,
}

const RESOURCES: &[ResourceDescriptor] = &[
    ResourceDescriptor {
        uri: "godot://scenes",
        name: "Scene files",
        description: "All scene files (.tscn, .scn) in the project",
        mime_type: JSON_MIME,
    },
    ResourceDescriptor {
        uri: "godot://scripts",
        name: "Script files",
        description: "All GDScript files (.gd) in the project",
        mime_type: JSON_MIME,
    },
    ResourceDescriptor {
        uri: "godot://scene/current",
        name: "Current scene",
        description: "Path and root node of the scene open in the editor, or null",
        mime_type: JSON_MIME,
    },
    ResourceDescriptor {
        uri: "godot://scene/tree",
        name: "Scene tree",
        description: "Full node tree of the scene open in the editor",
        mime_type: JSON_MIME,
    },
    ResourceDescriptor {
        uri: "godot://debug/log",
        name: "Debug log",
        description: "Editor debug output",
        mime_type: JSON_MIME,
    },
    ResourceDescriptor {
        uri: "godot://editor/selected",
        name: "Selected node",
        description: "Node currently selected in the editor, or null",
        mime_type: JSON_MIME,
    },
];

/// Errors from reading a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No resource has this URI.
    UnknownUri(String),
    /// The provider call behind the resource failed.
    Provider(ProviderError),
    /// The snapshot could not be serialized.
    Encode(String),
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUri(uri) => write!(f, "Unknown resource URI: {uri}"),
            Self::Provider(e) => write!(f, "{e}"),
            Self::Encode(msg) => write!(f, "Failed to encode resource: {msg}"),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ProviderError> for ResourceError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

/// All resources, in listing order.
pub fn list() -> &'static [ResourceDescriptor] {
    RESOURCES
}

fn extensions(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Produce the JSON text of resource `uri`.
pub async fn read(provider: &dyn EditorProvider, uri: &str) -> Result<String, ResourceError> {
    let snapshot = match uri {
        "godot://scenes" => {
            let files = provider.list_project_files(&extensions(&["tscn", "scn"])).await?;
            json!({ "files": files })
        }
        "godot://scripts" => {
            let files = provider.list_project_files(&extensions(&["gd"])).await?;
            json!({ "files": files })
        }
        "godot://scene/current" => encode(&provider.get_current_scene_info().await?)?,
        "godot://scene/tree" => encode(&provider.get_scene_tree().await?)?,
        "godot://debug/log" => {
            let output = provider.get_debug_output().await?;
            json!({ "output": output })
        }
        "godot://editor/selected" => encode(&provider.get_selected_node().await?)?,
        _ => return Err(ResourceError::UnknownUri(uri.to_string())),
    };
    canonical_json(&snapshot).map_err(|e| ResourceError::Encode(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ResourceError> {
    serde_json::to_value(value).map_err(|e| ResourceError::Encode(e.to_string()))
}
