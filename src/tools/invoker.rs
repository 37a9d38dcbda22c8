//! Tool invocation: lookup, argument parsing, validation, execution.

use futures::future::{join_all, try_join_all};
use serde_json::Value;

use super::arguments::ToolArguments;
use super::registry::ToolRegistry;
use super::response::ToolResponse;
use super::validation::{format_violations, validate_arguments, ValidationMode};
use crate::agent_loop::RunContext;
use crate::error::{StrandError, ToolError};
use crate::types::FunctionCall;

/// Invoke one tool call.
///
/// Unknown tools, malformed JSON, schema violations and soft tool errors come
/// back as error responses for the model to read. Only an unexpected handler
/// failure is returned as `Err`.
pub async fn invoke_tool(
    registry: &ToolRegistry,
    name: &str,
    raw_arguments: &str,
    ctx: &RunContext,
) -> Result<ToolResponse, StrandError> {
    let Some(tool) = registry.get(name) else {
        tracing::warn!(tool = name, "model called an unknown tool");
        return Ok(ToolResponse::error(format!("No tool found with name {name}")));
    };

    let parsed = match parse_arguments(raw_arguments) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(tool = name, error = %e, "malformed tool arguments");
            return Ok(ToolResponse::error(format!("Invalid JSON: {raw_arguments}")));
        }
    };

    let mode = if tool.partial() {
        ValidationMode::Partial
    } else {
        ValidationMode::Full
    };
    let mut args = match validate_arguments(&parsed, &tool.parameters().schema, mode) {
        Ok(args) => args,
        Err(violations) => {
            return Ok(ToolResponse::error(format!(
                "Invalid arguments for {name}:\n{}",
                format_violations(&violations)
            )));
        }
    };

    let rule_violations: Vec<_> = join_all(tool.validators().iter().map(|v| v.validate(&args)))
        .await
        .into_iter()
        .filter_map(Result::err)
        .flatten()
        .collect();
    if !rule_violations.is_empty() {
        return Ok(ToolResponse::error(format!(
            "Invalid arguments for {name}:\n{}",
            format_violations(&rule_violations)
        )));
    }

    for transformer in tool.transformers() {
        args = match transformer.transform(args).await {
            Ok(args) => args,
            Err(e) => return settle(name, Err(e)),
        };
    }

    let result = tool.handle(ToolArguments::new(args), ctx).await;
    settle(name, result)
}

/// Invoke every call concurrently; responses come back in call order.
///
/// The first fatal failure drops the remaining calls.
pub async fn invoke_all(
    registry: &ToolRegistry,
    calls: &[FunctionCall],
    ctx: &RunContext,
) -> Result<Vec<ToolResponse>, StrandError> {
    try_join_all(calls.iter().map(|call| async move {
        tracing::debug!(tool = %call.name, call_id = %call.call_id, "invoking tool");
        invoke_tool(registry, &call.name, &call.arguments, ctx).await
    }))
    .await
}

fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Ok(Value::Object(Default::default()))
    } else {
        serde_json::from_str(trimmed)
    }
}

fn settle(name: &str, result: Result<ToolResponse, ToolError>) -> Result<ToolResponse, StrandError> {
    match result {
        Ok(response) => Ok(response),
        Err(ToolError::Soft(message)) => {
            tracing::debug!(tool = name, %message, "tool reported an error");
            Ok(ToolResponse::error(message))
        }
        Err(ToolError::Failed(source)) => Err(StrandError::ToolHandler {
            tool_name: name.to_string(),
            source,
        }),
    }
}
