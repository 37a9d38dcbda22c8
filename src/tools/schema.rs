//! Argument schemas and tool-definition rendering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::StrandError;

/// JSON Schema describing a tool's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub schema: Value,
}

impl ToolSchema {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Derive the schema of a Rust type.
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        Self {
            schema: serde_json::to_value(root).unwrap_or_else(|_| json!({ "type": "object" })),
        }
    }

    /// A schema that accepts no arguments.
    pub fn empty() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Tool arguments must be a JSON object, and every `pattern` must compile.
    pub fn check(&self) -> Result<(), StrandError> {
        match self.schema.get("type").and_then(Value::as_str) {
            Some("object") => {}
            other => {
                return Err(StrandError::Configuration(format!(
                    "tool argument schema must have type \"object\", found {other:?}"
                )))
            }
        }
        check_patterns(&self.schema)
    }

    /// Schema as sent to the model: titles stripped, no extra properties.
    pub fn render(&self) -> Value {
        render_definition(&self.schema)
    }
}

/// Strip every `title` key and close the root object to extra properties.
pub fn render_definition(schema: &Value) -> Value {
    let mut rendered = schema.clone();
    strip_titles(&mut rendered);
    if let Value::Object(root) = &mut rendered {
        root.remove("$schema");
        root.insert("additionalProperties".into(), Value::Bool(false));
    }
    rendered
}

fn strip_titles(value: &mut Value) {
    match value {
        Value::Object(map) => {
            // "title" may legitimately be a property name.
            if map.get("title").is_some_and(Value::is_string) {
                map.remove("title");
            }
            for child in map.values_mut() {
                strip_titles(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_titles),
        _ => {}
    }
}

fn check_patterns(value: &Value) -> Result<(), StrandError> {
    match value {
        Value::Object(map) => {
            // A property named "pattern" holds a schema object, not a string.
            if let Some(pattern) = map.get("pattern").and_then(Value::as_str) {
                regex::Regex::new(pattern).map_err(|e| {
                    StrandError::Configuration(format!("invalid pattern {pattern:?}: {e}"))
                })?;
            }
            map.values().try_for_each(check_patterns)
        }
        Value::Array(items) => items.iter().try_for_each(check_patterns),
        _ => Ok(()),
    }
}

/// Builder for constructing tool parameter schemas.
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), schema);
        if required {
            self.required.push(name);
        }
        self
    }

    /// Add a string property.
    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description.into() }),
            required,
        )
    }

    /// Add a number property.
    pub fn number(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "number", "description": description.into() }),
            required,
        )
    }

    pub fn integer(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "integer", "description": description.into() }),
            required,
        )
    }

    /// Add a boolean property.
    pub fn boolean(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "boolean", "description": description.into() }),
            required,
        )
    }

    /// Add an enum (string) property.
    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description.into(), "enum": values }),
            required,
        )
    }

    /// Add an array property whose elements follow `items`.
    pub fn array(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        items: Value,
        required: bool,
    ) -> Self {
        self.property(
            name,
            json!({ "type": "array", "description": description.into(), "items": items }),
            required,
        )
    }

    pub fn build(self) -> ToolSchema {
        ToolSchema {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
