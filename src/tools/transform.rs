//! Argument rules and transformers that run between schema validation and
//! the tool handler.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, SecondsFormat};
use serde_json::Value;

use super::validation::Violation;
use crate::error::{StrandError, ToolError};

/// Extra validation over schema-valid arguments.
///
/// Violations are reported to the model like schema violations.
#[async_trait]
pub trait ArgumentValidator: Send + Sync {
    async fn validate(&self, args: &Value) -> Result<(), Vec<Violation>>;
}

/// Rewrites arguments before they reach the handler.
#[async_trait]
pub trait ArgumentTransformer: Send + Sync {
    async fn transform(&self, args: Value) -> Result<Value, ToolError>;
}

type RuleCheck = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

/// Checks applied to every value matched by a path expression.
///
/// Paths look like `$.order.items[*].qty`; `[*]` matches every element and
/// `[n]` a single index.
pub struct PathRule {
    path: String,
    segments: Vec<PathSegment>,
    checks: Vec<Arc<RuleCheck>>,
}

impl PathRule {
    pub fn new(path: impl Into<String>) -> Result<Self, StrandError> {
        let path = path.into();
        let segments = parse_path(&path)?;
        Ok(Self {
            path,
            segments,
            checks: Vec::new(),
        })
    }

    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl ArgumentValidator for PathRule {
    async fn validate(&self, args: &Value) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        for (path, value) in resolve_segments(args, &self.segments) {
            for check in &self.checks {
                if let Err(message) = check(value) {
                    violations.push(Violation {
                        path: path.clone(),
                        message,
                    });
                }
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PathSegment {
    Field(String),
    Index(usize),
    Wildcard,
}

fn parse_path(expr: &str) -> Result<Vec<PathSegment>, StrandError> {
    let invalid = || StrandError::Configuration(format!("invalid path expression: {expr}"));
    let rest = expr.strip_prefix('$').ok_or_else(invalid)?;
    let mut segments = Vec::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                let mut field = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    field.push(next);
                    chars.next();
                }
                if field.is_empty() {
                    return Err(invalid());
                }
                segments.push(PathSegment::Field(field));
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
                match inner.as_str() {
                    "*" => segments.push(PathSegment::Wildcard),
                    index => segments.push(PathSegment::Index(
                        index.parse().map_err(|_| invalid())?,
                    )),
                }
            }
            _ => return Err(invalid()),
        }
    }
    Ok(segments)
}

/// Resolve a path expression against `data`, returning each match with its
/// dotted location.
pub fn resolve_path<'v>(data: &'v Value, expr: &str) -> Result<Vec<(String, &'v Value)>, StrandError> {
    let segments = parse_path(expr)?;
    Ok(resolve_segments(data, &segments))
}

fn resolve_segments<'v>(data: &'v Value, segments: &[PathSegment]) -> Vec<(String, &'v Value)> {
    let mut matches = vec![(String::new(), data)];
    for segment in segments {
        matches = matches
            .into_iter()
            .flat_map(|(loc, value)| step(loc, value, segment))
            .collect();
    }
    matches
}

fn step<'v>(loc: String, value: &'v Value, segment: &PathSegment) -> Vec<(String, &'v Value)> {
    match (segment, value) {
        (PathSegment::Field(name), Value::Object(map)) => map
            .get(name)
            .map(|child| {
                let loc = if loc.is_empty() { name.clone() } else { format!("{loc}.{name}") };
                vec![(loc, child)]
            })
            .unwrap_or_default(),
        (PathSegment::Index(index), Value::Array(items)) => items
            .get(*index)
            .map(|child| vec![(format!("{loc}[{index}]"), child)])
            .unwrap_or_default(),
        (PathSegment::Wildcard, Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, child)| (format!("{loc}[{index}]"), child))
            .collect(),
        _ => Vec::new(),
    }
}

fn value_at_mut<'v>(data: &'v mut Value, path: &[String]) -> Option<&'v mut Value> {
    path.iter()
        .try_fold(data, |current, key| current.as_object_mut()?.get_mut(key))
}

/// Decode JSON carried inside strings at `path` (and one level below it).
pub struct JsonExtractor {
    path: Vec<String>,
}

impl JsonExtractor {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
        }
    }
}

fn extract_json(value: Value) -> Value {
    match value {
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(decoded) => extract_json(decoded),
            Err(_) => Value::String(raw),
        },
        other => other,
    }
}

#[async_trait]
impl ArgumentTransformer for JsonExtractor {
    async fn transform(&self, mut args: Value) -> Result<Value, ToolError> {
        let Some(target) = value_at_mut(&mut args, &self.path) else {
            return Ok(args);
        };
        let extracted = extract_json(target.take());
        *target = match extracted {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, extract_json(value)))
                    .collect(),
            ),
            other => other,
        };
        Ok(args)
    }
}

/// Turn `[{"field": 1}, {"other": -1}]` into `[["field", 1], ["other", -1]]`.
pub struct SortPairs {
    field: String,
}

impl SortPairs {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl Default for SortPairs {
    fn default() -> Self {
        Self::new("sort")
    }
}

#[async_trait]
impl ArgumentTransformer for SortPairs {
    async fn transform(&self, mut args: Value) -> Result<Value, ToolError> {
        let Some(target) = args.get_mut(&self.field) else {
            return Ok(args);
        };
        let Value::Array(entries) = target.take() else {
            return Ok(args);
        };
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some((key, direction)) = entry.as_object().and_then(|map| map.iter().next()) else {
                return Err(ToolError::soft(format!(
                    "{}: each entry must be an object like {{\"field\": 1}}",
                    self.field
                )));
            };
            pairs.push(Value::Array(vec![Value::String(key.clone()), direction.clone()]));
        }
        *target = Value::Array(pairs);
        Ok(args)
    }
}

/// Normalize date strings under `path` to RFC 3339 (UTC).
///
/// Strings matching one of `formats` are converted, as are `{"$date": ".."}`
/// wrappers; objects and arrays are walked recursively.
pub struct DateNormalizer {
    path: Vec<String>,
    formats: Vec<String>,
}

impl DateNormalizer {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            formats: vec!["%Y-%m-%d".into(), "%Y-%m-%dT%H:%M:%SZ".into()],
        }
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    fn convert(&self, raw: &str) -> Option<String> {
        self.formats.iter().find_map(|format| {
            let naive = NaiveDateTime::parse_from_str(raw, format).ok().or_else(|| {
                NaiveDate::parse_from_str(raw, format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })?;
            Some(naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
        })
    }

    fn walk(&self, value: &mut Value) {
        if let Some(converted) = value
            .get("$date")
            .and_then(Value::as_str)
            .and_then(|d| self.convert(d))
        {
            *value = Value::String(converted);
            return;
        }
        match value {
            Value::String(raw) => {
                if let Some(converted) = self.convert(raw) {
                    *raw = converted;
                }
            }
            Value::Object(map) => map.values_mut().for_each(|child| self.walk(child)),
            Value::Array(items) => items.iter_mut().for_each(|child| self.walk(child)),
            _ => {}
        }
    }
}

#[async_trait]
impl ArgumentTransformer for DateNormalizer {
    async fn transform(&self, mut args: Value) -> Result<Value, ToolError> {
        if let Some(target) = value_at_mut(&mut args, &self.path) {
            let encoded = matches!(&*target, Value::String(raw) if self.convert(raw).is_none());
            if encoded {
                *target = extract_json(target.take());
            }
            self.walk(target);
        }
        Ok(args)
    }
}
