//! Validation of loosely typed tool arguments.
//!
//! All checks run before the provider is touched, so a bad argument never
//! costs a round trip to the editor.

use serde_json::{Map, Value};

use super::ToolError;

/// Arguments of one `tools/call`.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    map: Map<String, Value>,
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self { map }
    }
}

fn missing(key: &str) -> ToolError {
    ToolError::InvalidParams(format!("Missing required argument '{key}'"))
}

fn mistyped(key: &str, expected: &str) -> ToolError {
    ToolError::InvalidParams(format!("Argument '{key}' must be {expected}"))
}

impl Arguments {
    /// Absent and `null` are treated alike.
    fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Required string argument.
    pub fn required_str(&self, key: &str) -> Result<String, ToolError> {
        match self.get(key) {
            None => Err(missing(key)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(mistyped(key, "a string")),
        }
    }

    /// Optional string argument. An empty string counts as absent.
    pub fn optional_str(&self, key: &str) -> Result<Option<String>, ToolError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(mistyped(key, "a string")),
        }
    }

    /// Required argument of any type, as text: strings verbatim, anything
    /// else in compact JSON form (`42`, `true`, `[1,2]`).
    pub fn required_value_text(&self, key: &str) -> Result<String, ToolError> {
        match self.get(key) {
            None => Err(missing(key)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
        }
    }

    /// Optional array of strings.
    pub fn optional_string_list(&self, key: &str) -> Result<Option<Vec<String>>, ToolError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .map(Some)
            .ok_or_else(|| mistyped(key, "an array of strings"))
    }

    /// Optional number.
    pub fn optional_number(&self, key: &str) -> Result<Option<f64>, ToolError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| mistyped(key, "a number")),
        }
    }

    /// Optional 2D vector, given as `[x, y]` or `{"x": .., "y": ..}`.
    pub fn optional_vector2(&self, key: &str) -> Result<Option<(f64, f64)>, ToolError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let pair = match value {
            Value::Array(items) if items.len() == 2 => items[0].as_f64().zip(items[1].as_f64()),
            Value::Object(map) => map
                .get("x")
                .and_then(Value::as_f64)
                .zip(map.get("y").and_then(Value::as_f64)),
            _ => None,
        };
        pair.map(Some)
            .ok_or_else(|| mistyped(key, "a vector [x, y]"))
    }
}
