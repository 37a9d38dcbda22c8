//! Drain a run and turn its final answer into a result.

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::types::{RunItem, RunMode};
use crate::agent::{OutputSchema, Session};
use crate::error::StrandError;
use crate::tools::format_violations;
use crate::types::Item;

/// Everything a completed run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    /// Items appended to the log during the run, in order.
    pub items: Vec<Item>,
    /// The last item of the terminal turn.
    pub final_output: Option<Item>,
    /// Validated answer, when the terminal agent has an output schema.
    pub structured: Option<Value>,
}

impl RunOutcome {
    /// Text of the final message.
    pub fn final_text(&self) -> Option<String> {
        self.final_output.as_ref().and_then(Item::text)
    }
}

impl Session {
    /// Run in buffered mode until done.
    pub async fn run_to_completion(&mut self) -> Result<RunOutcome, StrandError> {
        self.complete(RunMode::Buffered, CancellationToken::new()).await
    }

    /// Run until done and deserialize the structured answer.
    pub async fn run_to_completion_as<T: DeserializeOwned>(&mut self) -> Result<T, StrandError> {
        let outcome = self.run_to_completion().await?;
        let value = outcome.structured.ok_or_else(|| {
            StrandError::Configuration(format!(
                "agent '{}' has no output schema",
                self.answering_agent().name()
            ))
        })?;
        serde_json::from_value(value).map_err(|e| StrandError::InvalidSchemaResponse(e.to_string()))
    }

    /// Drain a run in `mode`. When the agent that produced the terminal
    /// response has an output schema, the final item is parsed and validated
    /// against it, even if a postflight patch switched agents afterwards.
    pub async fn complete(
        &mut self,
        mode: RunMode,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, StrandError> {
        let mut items = Vec::new();
        {
            let mut run = self.run_with(mode, cancel);
            while let Some(next) = run.next().await {
                if let RunItem::Item(item) = next? {
                    items.push(item);
                }
            }
        }

        let final_output = items.last().cloned();
        let structured = match self.answering_agent().output_schema() {
            Some(schema) => Some(parse_structured_output(final_output.as_ref(), schema)?),
            None => None,
        };
        Ok(RunOutcome {
            items,
            final_output,
            structured,
        })
    }
}

/// Parse and validate a final answer.
///
/// A refusal, unparseable JSON and a schema mismatch are distinct errors.
pub fn parse_structured_output(
    item: Option<&Item>,
    schema: &OutputSchema,
) -> Result<Value, StrandError> {
    let item = item.ok_or(StrandError::EmptyResponse)?;
    if let Some(refusal) = item.refusal_text() {
        return Err(StrandError::Refusal(refusal.to_string()));
    }
    let text = item.text().ok_or(StrandError::EmptyResponse)?;
    let value: Value =
        serde_json::from_str(&text).map_err(|e| StrandError::InvalidJsonResponse(e.to_string()))?;
    schema
        .validate(&value)
        .map_err(|violations| StrandError::InvalidSchemaResponse(format_violations(&violations)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> OutputSchema {
        OutputSchema::new(
            "answer",
            json!({
                "type": "object",
                "properties": { "value": { "type": "integer" } },
                "required": ["value"],
            }),
        )
    }

    #[test]
    fn accepts_valid_json() {
        let value = parse_structured_output(Some(&Item::assistant(r#"{"value": 4}"#)), &schema())
            .unwrap();
        assert_eq!(value, json!({ "value": 4 }));
    }

    #[test]
    fn refusal_is_reported() {
        let err = parse_structured_output(Some(&Item::refusal("cannot help")), &schema())
            .unwrap_err();
        assert!(matches!(err, StrandError::Refusal(ref m) if m == "cannot help"));
    }

    #[test]
    fn bad_json_and_bad_shape_are_distinct() {
        let err = parse_structured_output(Some(&Item::assistant("{value")), &schema()).unwrap_err();
        assert!(matches!(err, StrandError::InvalidJsonResponse(_)));

        let err = parse_structured_output(Some(&Item::assistant(r#"{"value": "x"}"#)), &schema())
            .unwrap_err();
        assert!(matches!(err, StrandError::InvalidSchemaResponse(ref m) if m.contains("value")));
    }

    #[test]
    fn missing_output_is_empty_response() {
        assert!(matches!(
            parse_structured_output(None, &schema()),
            Err(StrandError::EmptyResponse)
        ));
        assert!(matches!(
            parse_structured_output(Some(&Item::function_call("c", "f", "{}")), &schema()),
            Err(StrandError::EmptyResponse)
        ));
    }
}
