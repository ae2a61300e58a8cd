//! Typed extraction from editor result objects.
//!
//! Required fields fail loudly with [`ProviderError::Response`]. The only
//! lenient spots are property maps (unknown value shapes are skipped) and
//! list entries that the editor is known to pad with incomplete rows.

use serde_json::{Map, Value};

use super::ProviderError;
use crate::scene::{NodeSummary, PropertyBag, PropertyValue, SceneNode};

/// A `result` object together with the command that produced it, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
    command: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Payload<'a> {
    /// Wrap the result of `command`.
    pub fn new(command: &'a str, map: &'a Map<String, Value>) -> Self {
        Self { command, map }
    }

    fn missing(&self, key: &str, expected: &str) -> ProviderError {
        ProviderError::Response(format!(
            "{}: expected {expected} field '{key}'",
            self.command
        ))
    }

    /// Required string field.
    pub fn string(&self, key: &str) -> Result<String, ProviderError> {
        self.map
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.missing(key, "string"))
    }

    /// String field that may be absent or null. Any other type is an error.
    pub fn opt_string(&self, key: &str) -> Result<Option<String>, ProviderError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.missing(key, "string")),
        }
    }

    /// Required boolean field.
    pub fn bool(&self, key: &str) -> Result<bool, ProviderError> {
        self.map
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| self.missing(key, "boolean"))
    }

    /// Required object field.
    pub fn object(&self, key: &str) -> Result<&'a Map<String, Value>, ProviderError> {
        self.map
            .get(key)
            .and_then(Value::as_object)
            .ok_or_else(|| self.missing(key, "object"))
    }

    /// Required array field.
    pub fn array(&self, key: &str) -> Result<&'a Vec<Value>, ProviderError> {
        self.map
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| self.missing(key, "array"))
    }

    /// Required array of strings. A non-string element is an error.
    pub fn strings(&self, key: &str) -> Result<Vec<String>, ProviderError> {
        self.array(key)?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.missing(key, "array of strings"))
            })
            .collect()
    }

    /// Required array, keeping the elements `f` accepts.
    pub fn array_of<T>(
        &self,
        key: &str,
        f: impl Fn(&Value) -> Option<T>,
    ) -> Result<Vec<T>, ProviderError> {
        Ok(self.array(key)?.iter().filter_map(f).collect())
    }
}

/// Render one dynamically typed value. `None` for shapes with no rendering.
pub fn decode_property_value(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::Bool(b) => Some(PropertyValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(PropertyValue::Integer)
            .or_else(|| n.as_f64().map(PropertyValue::Float)),
        Value::String(s) => Some(PropertyValue::Text(s.clone())),
        Value::Object(map) => Some(PropertyValue::Map(decode_properties(map))),
        Value::Null | Value::Array(_) => None,
    }
}

/// Render a property map, skipping entries with no rendering.
pub fn decode_properties(map: &Map<String, Value>) -> PropertyBag {
    map.iter()
        .filter_map(|(key, value)| {
            let rendered = decode_property_value(value);
            if rendered.is_none() {
                log::debug!("[Decode] Skipping property '{key}' with unsupported value");
            }
            rendered.map(|v| (key.clone(), v))
        })
        .collect()
}

/// `{name, type, path}` entry; `None` if any field is missing.
pub fn decode_node_summary(value: &Value) -> Option<NodeSummary> {
    let map = value.as_object()?;
    Some(NodeSummary {
        name: map.get("name")?.as_str()?.to_string(),
        node_type: map.get("type")?.as_str()?.to_string(),
        path: map.get("path")?.as_str()?.to_string(),
    })
}

/// Decode a scene tree depth-first.
///
/// A node missing `path`, `name`, `type`, or the `children` key yields
/// `None` for its whole subtree. `children: null` means "not expanded".
/// A child that fails to decode is left out of its parent.
pub fn decode_scene_node(value: &Value) -> Option<SceneNode> {
    let map = value.as_object()?;
    let path = map.get("path")?.as_str()?.to_string();
    let name = map.get("name")?.as_str()?.to_string();
    let node_type = map.get("type")?.as_str()?.to_string();
    let children = match map.get("children")? {
        Value::Null => None,
        Value::Array(items) => Some(items.iter().filter_map(decode_scene_node).collect()),
        _ => return None,
    };
    let script = map.get("script").and_then(Value::as_str).map(str::to_string);
    let properties = map
        .get("properties")
        .and_then(Value::as_object)
        .map(decode_properties)
        .unwrap_or_default();

    Some(SceneNode {
        name,
        node_type,
        path,
        script,
        properties,
        children,
    })
}
