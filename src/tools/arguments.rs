//! Typed access to tool call arguments.

use serde_json::Value;

use crate::error::ToolError;

/// Validated tool call arguments with typed extraction.
///
/// Extraction failures are soft errors, so handlers can use `?` and the
/// message reaches the model.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &Value {
        &self.value
    }

    pub fn into_inner(self) -> Value {
        self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, ToolError> {
        self.value
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::soft(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ToolError> {
        self.value
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::soft(format!("Missing integer argument: {key}")))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, ToolError> {
        self.value
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::soft(format!("Missing number argument: {key}")))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ToolError> {
        self.value
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| ToolError::soft(format!("Missing boolean argument: {key}")))
    }

    pub fn get_array(&self, key: &str) -> Result<&Vec<Value>, ToolError> {
        self.value
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::soft(format!("Missing array argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(self.value.clone())
            .map_err(|e| ToolError::soft(format!("Failed to deserialize arguments: {e}")))
    }
}
