//! Normalized tool results.

use serde_json::{json, Map, Value};

use crate::types::Item;

/// Result of one tool invocation, as fed back to the model.
///
/// The payload is always object-shaped: bare strings and scalars are wrapped
/// as `{"message": value}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResponse {
    pub output: Option<Map<String, Value>>,
    pub is_error: bool,
    /// Items spliced into the log right after this call's output record.
    pub additional_inputs: Vec<Item>,
}

impl ToolResponse {
    pub fn new(output: impl Into<Value>) -> Self {
        Self {
            output: wrap_payload(output.into()),
            is_error: false,
            additional_inputs: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            output: wrap_payload(Value::String(message.into())),
            is_error: true,
            additional_inputs: Vec::new(),
        }
    }

    pub fn with_additional_input(mut self, item: Item) -> Self {
        self.additional_inputs.push(item);
        self
    }

    /// Text recorded as the tool-output item.
    pub fn output_str(&self) -> String {
        let body = json!({ "output": self.output }).to_string();
        if self.is_error {
            format!("[Error] {body}")
        } else {
            body
        }
    }
}

fn wrap_payload(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(map),
        Value::String(s) if s.is_empty() => None,
        other => {
            let mut map = Map::new();
            map.insert("message".into(), other);
            Some(map)
        }
    }
}

impl From<Value> for ToolResponse {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<Map<String, Value>> for ToolResponse {
    fn from(map: Map<String, Value>) -> Self {
        Self::new(Value::Object(map))
    }
}

impl From<String> for ToolResponse {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for ToolResponse {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<i64> for ToolResponse {
    fn from(n: i64) -> Self {
        Self::new(n)
    }
}

impl From<f64> for ToolResponse {
    fn from(n: f64) -> Self {
        Self::new(n)
    }
}

impl From<bool> for ToolResponse {
    fn from(b: bool) -> Self {
        Self::new(b)
    }
}

impl From<()> for ToolResponse {
    fn from(_: ()) -> Self {
        Self::default()
    }
}
