//! Validate tool call arguments against JSON Schema before execution.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

const MAX_REF_DEPTH: usize = 32;

/// One schema violation: where it happened and what was wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted field path (`items[0].name`); empty for the root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Render violations one per line.
pub fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// How optional fields missing from the input are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Missing optional fields are filled with their default (or null).
    #[default]
    Full,
    /// Only fields present in the input appear in the result.
    Partial,
}

/// Validate and coerce `args` against `schema`.
///
/// Returns the coerced value, or every violation found. Supports the subset of
/// JSON Schema produced by tool schema builders and `schemars`: `type`
/// (including type lists), `properties`, `required`, `additionalProperties`,
/// `items`, `enum`, `const`, `anyOf`/`oneOf`/`allOf`, local `$ref`, and the
/// usual string/number/array bounds.
pub fn validate_arguments(
    args: &Value,
    schema: &Value,
    mode: ValidationMode,
) -> Result<Value, Vec<Violation>> {
    let mut validator = Validator {
        root: schema,
        mode,
        violations: Vec::new(),
    };
    let coerced = validator.check(schema, args, "");
    if validator.violations.is_empty() {
        Ok(coerced)
    } else {
        Err(validator.violations)
    }
}

struct Validator<'a> {
    root: &'a Value,
    mode: ValidationMode,
    violations: Vec<Violation>,
}

impl<'a> Validator<'a> {
    fn fail(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn resolve(&self, mut schema: &'a Value) -> &'a Value {
        for _ in 0..MAX_REF_DEPTH {
            let Some(target) = schema
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix('#'))
                .and_then(|pointer| self.root.pointer(pointer))
            else {
                break;
            };
            schema = target;
        }
        schema
    }

    fn check(&mut self, schema: &'a Value, value: &Value, path: &str) -> Value {
        let schema = self.resolve(schema);

        if let Value::Bool(allowed) = schema {
            if !allowed {
                self.fail(path, "value not allowed");
            }
            return value.clone();
        }

        let mut current = value.clone();
        if let Some(all) = schema.get("allOf").and_then(Value::as_array) {
            for part in all {
                current = self.check(part, &current, path);
            }
        }

        if let Some(branches) = schema
            .get("anyOf")
            .or_else(|| schema.get("oneOf"))
            .and_then(Value::as_array)
        {
            match self.first_matching_branch(branches, &current, path) {
                Some(coerced) => current = coerced,
                None => {
                    self.fail(path, "value does not match any allowed schema");
                    return current;
                }
            }
        }

        if let Some(types) = schema_types(schema) {
            match coerce_type(&current, &types) {
                Some(coerced) => current = coerced,
                None => {
                    self.fail(
                        path,
                        format!("expected {}, got {}", types.join(" or "), json_type_name(&current)),
                    );
                    return current;
                }
            }
        }

        if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
            if !allowed.contains(&current) {
                self.fail(path, format!("value must be one of {}", Value::Array(allowed.clone())));
            }
        }
        if let Some(expected) = schema.get("const") {
            if expected != &current {
                self.fail(path, format!("value must be {expected}"));
            }
        }

        match &current {
            Value::Object(map) => return Value::Object(self.check_object(schema, map, path)),
            Value::Array(items) => return Value::Array(self.check_array(schema, items, path)),
            Value::String(text) => self.check_string(schema, text, path),
            Value::Number(number) => self.check_number(schema, number, path),
            _ => {}
        }
        current
    }

    fn first_matching_branch(
        &mut self,
        branches: &'a [Value],
        value: &Value,
        path: &str,
    ) -> Option<Value> {
        branches.iter().find_map(|branch| {
            let mut trial = Validator {
                root: self.root,
                mode: self.mode,
                violations: Vec::new(),
            };
            let coerced = trial.check(branch, value, path);
            trial.violations.is_empty().then_some(coerced)
        })
    }

    fn check_object(
        &mut self,
        schema: &'a Value,
        map: &Map<String, Value>,
        path: &str,
    ) -> Map<String, Value> {
        let properties = schema.get("properties").and_then(Value::as_object);
        let additional = schema.get("additionalProperties");
        let mut result = Map::new();

        for (key, value) in map {
            let child = child_path(path, key);
            match (properties.and_then(|p| p.get(key)), additional) {
                (Some(property), _) => {
                    let coerced = self.check(property, value, &child);
                    result.insert(key.clone(), coerced);
                }
                (None, Some(Value::Bool(false))) => self.fail(&child, "unexpected field"),
                (None, Some(extra @ Value::Object(_))) => {
                    let coerced = self.check(extra, value, &child);
                    result.insert(key.clone(), coerced);
                }
                (None, _) => {
                    result.insert(key.clone(), value.clone());
                }
            }
        }

        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        for name in &required {
            if !map.contains_key(*name) {
                self.fail(&child_path(path, name), "field required");
            }
        }

        if self.mode == ValidationMode::Full {
            for (name, property) in properties.into_iter().flatten() {
                if map.contains_key(name) || required.contains(&name.as_str()) {
                    continue;
                }
                let default = self.resolve(property).get("default").cloned();
                result.insert(name.clone(), default.unwrap_or(Value::Null));
            }
        }

        result
    }

    fn check_array(&mut self, schema: &'a Value, items: &[Value], path: &str) -> Vec<Value> {
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                self.fail(path, format!("expected at least {min} items"));
            }
        }
        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if (items.len() as u64) > max {
                self.fail(path, format!("expected at most {max} items"));
            }
        }

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let child = format!("{path}[{index}]");
                match schema.get("items") {
                    Some(Value::Array(positional)) => match positional.get(index) {
                        Some(item_schema) => self.check(item_schema, item, &child),
                        None => item.clone(),
                    },
                    Some(item_schema) => self.check(item_schema, item, &child),
                    None => item.clone(),
                }
            })
            .collect()
    }

    fn check_string(&mut self, schema: &Value, text: &str, path: &str) {
        let length = text.chars().count() as u64;
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if length < min {
                self.fail(path, format!("expected at least {min} characters"));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if length > max {
                self.fail(path, format!("expected at most {max} characters"));
            }
        }
        if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            match regex::Regex::new(pattern) {
                Ok(re) if !re.is_match(text) => {
                    self.fail(path, format!("value does not match pattern {pattern:?}"));
                }
                Ok(_) => {}
                Err(_) => self.fail(path, format!("schema pattern {pattern:?} is not a valid regex")),
            }
        }
    }

    fn check_number(&mut self, schema: &Value, number: &Number, path: &str) {
        let Some(value) = number.as_f64() else {
            return;
        };
        let bound = |key: &str| schema.get(key).and_then(Value::as_f64);
        if let Some(min) = bound("minimum") {
            if value < min {
                self.fail(path, format!("must be >= {min}"));
            }
        }
        if let Some(max) = bound("maximum") {
            if value > max {
                self.fail(path, format!("must be <= {max}"));
            }
        }
        if let Some(min) = bound("exclusiveMinimum") {
            if value <= min {
                self.fail(path, format!("must be > {min}"));
            }
        }
        if let Some(max) = bound("exclusiveMaximum") {
            if value >= max {
                self.fail(path, format!("must be < {max}"));
            }
        }
    }
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn schema_types(schema: &Value) -> Option<Vec<String>> {
    let mut types: Vec<String> = match schema.get("type")? {
        Value::String(single) => vec![single.clone()],
        Value::Array(list) => list.iter().filter_map(Value::as_str).map(String::from).collect(),
        _ => return None,
    };
    if schema.get("nullable").and_then(Value::as_bool) == Some(true) {
        types.push("null".into());
    }
    Some(types)
}

/// Exact type matches win; then lax conversions (numeric strings, whole floats).
fn coerce_type(value: &Value, types: &[String]) -> Option<Value> {
    if types.iter().any(|t| value_matches_type(value, t)) {
        return Some(value.clone());
    }
    types.iter().find_map(|t| match (t.as_str(), value) {
        ("integer", Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        ("integer", Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        ("number", Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        ("boolean", Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    })
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn violations(args: Value, schema: Value) -> Vec<Violation> {
        validate_arguments(&args, &schema, ValidationMode::Full).unwrap_err()
    }

    #[test]
    fn rejects_non_object_args_when_schema_expects_object() {
        let schema = json!({ "type": "object", "properties": {}, "required": [] });

        let errors = violations(json!("not an object"), schema);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "expected object, got string");
    }

    #[test]
    fn reports_every_missing_required_field() {
        let schema = json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" },
            },
            "required": ["path", "content"],
        });

        let errors = violations(json!({}), schema);

        assert_eq!(
            format_violations(&errors),
            "path: field required\ncontent: field required"
        );
    }

    #[test]
    fn reports_nested_paths() {
        let schema = json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "qty": { "type": "integer", "minimum": 1 } },
                        "required": ["qty"],
                    },
                },
            },
        });

        let errors = violations(json!({ "items": [{ "qty": 2 }, { "qty": 0 }, {}] }), schema);

        assert_eq!(
            errors,
            vec![
                Violation { path: "items[1].qty".into(), message: "must be >= 1".into() },
                Violation { path: "items[2].qty".into(), message: "field required".into() },
            ]
        );
    }

    #[test]
    fn coerces_numeric_strings_and_whole_floats() {
        let schema = json!({
            "type": "object",
            "properties": {
                "count": { "type": "integer" },
                "ratio": { "type": "number" },
                "flag": { "type": "boolean" },
            },
        });

        let coerced = validate_arguments(
            &json!({ "count": "3", "ratio": "0.5", "flag": "true" }),
            &schema,
            ValidationMode::Partial,
        )
        .unwrap();

        assert_eq!(coerced, json!({ "count": 3, "ratio": 0.5, "flag": true }));
        assert_eq!(
            validate_arguments(&json!({ "count": 4.0 }), &schema, ValidationMode::Partial).unwrap(),
            json!({ "count": 4 })
        );
    }

    #[test]
    fn full_mode_fills_defaults_partial_mode_does_not() {
        let schema = json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "limit": { "type": "integer", "default": 10 },
                "cursor": { "type": ["string", "null"] },
            },
            "required": ["query"],
        });
        let args = json!({ "query": "rust" });

        assert_eq!(
            validate_arguments(&args, &schema, ValidationMode::Full).unwrap(),
            json!({ "query": "rust", "limit": 10, "cursor": null })
        );
        assert_eq!(
            validate_arguments(&args, &schema, ValidationMode::Partial).unwrap(),
            json!({ "query": "rust" })
        );
    }

    #[test]
    fn rejects_extra_fields_when_closed() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "additionalProperties": false,
        });

        let errors = violations(json!({ "a": "x", "b": 1 }), schema);

        assert_eq!(errors[0].to_string(), "b: unexpected field");
    }

    #[test]
    fn follows_local_refs_and_any_of() {
        let schema = json!({
            "type": "object",
            "properties": {
                "owner": { "anyOf": [{ "$ref": "#/definitions/User" }, { "type": "null" }] },
            },
            "required": ["owner"],
            "definitions": {
                "User": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["name"],
                },
            },
        });

        assert!(validate_arguments(&json!({ "owner": null }), &schema, ValidationMode::Full).is_ok());
        assert!(
            validate_arguments(&json!({ "owner": { "name": "ada" } }), &schema, ValidationMode::Full)
                .is_ok()
        );
        let errors = violations(json!({ "owner": { "nick": "ada" } }), schema);
        assert_eq!(errors[0].path, "owner");
    }

    #[test]
    fn enforces_enum_and_pattern() {
        let schema = json!({
            "type": "object",
            "properties": {
                "unit": { "type": "string", "enum": ["c", "f"] },
                "code": { "type": "string", "pattern": "^[A-Z]{3}$" },
            },
        });

        let errors = violations(json!({ "unit": "k", "code": "oslo" }), schema);

        let mut paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["code", "unit"]);
    }

    #[test]
    fn invalid_pattern_is_a_violation_not_a_pass() {
        let schema = json!({
            "type": "object",
            "properties": { "code": { "type": "string", "pattern": "([A-Z" } },
        });

        let errors = violations(json!({ "code": "anything" }), schema);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "code");
        assert!(errors[0].message.contains("not a valid regex"));
    }

    #[test]
    fn accepts_valid_args() {
        let schema = json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"],
        });
        assert_eq!(
            validate_arguments(&json!({ "message": "hi" }), &schema, ValidationMode::Full).unwrap(),
            json!({ "message": "hi" })
        );
    }
}
