//! Typed editor entities returned by the provider.
//!
//! All types serialize through `serde_json` with `BTreeMap`-ordered property
//! bags, so equal values always render to identical text.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Property name → rendered value, in key order.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

/// Best-effort typed rendering of a dynamically typed editor value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// `true` / `false`.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// String, including editor-stringified values like `"(1, 2)"`.
    Text(String),
    /// Nested map (e.g. a resource's own properties).
    Map(PropertyBag),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            // Debug keeps the fractional part: 1.0 prints as "1.0", not "1".
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Text(s) => f.write_str(s),
            Self::Map(map) => {
                let text = serde_json::to_string(map).map_err(|_e| fmt::Error)?;
                f.write_str(&text)
            }
        }
    }
}

/// One node of the editor's scene tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    /// Node name.
    pub name: String,
    /// Godot class name, e.g. `Node2D`.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Absolute node path, e.g. `/root/Main/Player`.
    pub path: String,
    /// Attached script resource path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Node properties.
    pub properties: PropertyBag,
    /// `None` when the subtree was not expanded; `Some(vec![])` for a leaf.
    pub children: Option<Vec<SceneNode>>,
}

impl SceneNode {
    /// Total node count of this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(SceneNode::count)
            .sum::<usize>()
    }

    /// Depth-first search by absolute path.
    pub fn find(&self, path: &str) -> Option<&SceneNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().flatten().find_map(|child| child.find(path))
    }
}

/// Name, type and path of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    /// Node name.
    pub name: String,
    /// Godot class name.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Absolute node path.
    pub path: String,
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.name, self.node_type, self.path)
    }
}

/// The scene currently open in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneInfo {
    /// Scene file, e.g. `res://main.tscn`. Unsaved scenes have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Name of the scene's root node.
    pub root_node_name: String,
    /// Class of the scene's root node.
    pub root_node_type: String,
}

/// Partial update of a `Node2D` transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform2DUpdate {
    /// Node to update.
    pub node_path: String,
    /// New position `(x, y)`.
    pub position: Option<(f64, f64)>,
    /// New rotation in radians.
    pub rotation: Option<f64>,
    /// New scale `(x, y)`.
    pub scale: Option<(f64, f64)>,
}

impl Transform2DUpdate {
    /// Update of `node_path` that changes nothing yet.
    pub fn new(node_path: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
            position: None,
            rotation: None,
            scale: None,
        }
    }

    /// True when no component is set.
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.rotation.is_none() && self.scale.is_none()
    }

    /// Command parameters; unset components are omitted.
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("node_path".into(), json!(self.node_path));
        if let Some((x, y)) = self.position {
            params.insert("position".into(), json!([x, y]));
        }
        if let Some(rotation) = self.rotation {
            params.insert("rotation".into(), json!(rotation));
        }
        if let Some((x, y)) = self.scale {
            params.insert("scale".into(), json!([x, y]));
        }
        params
    }
}
