//! OpenAI Responses API transport.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{bearer_headers, shared_client, status_to_error, SseBuffer};
use super::{EventStream, ModelRequest, ModelTransport};
use crate::config::StrandConfig;
use crate::error::StrandError;
use crate::types::{Item, ModelResponse, OutputFormat, StreamEvent, Usage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Transport speaking the `/responses` endpoint.
#[derive(Clone)]
pub struct OpenAiResponsesTransport {
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiResponsesTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiResponsesTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiResponsesTransport {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from the `openai` provider entry of a config.
    pub fn from_config(config: &StrandConfig) -> Result<Self, StrandError> {
        let api_key = config.get_api_key("openai").ok_or_else(|| {
            StrandError::Authentication("Missing OPENAI_API_KEY for the OpenAI transport".into())
        })?;
        let transport = Self::new(api_key);
        Ok(match config.get_base_url("openai") {
            Some(url) => transport.with_base_url(url),
            None => transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request_body(&self, request: &ModelRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": request.model,
            "instructions": request.instructions,
            "input": request.input,
            "stream": stream,
            "store": request.store,
            "truncation": request.truncation,
        });
        let obj = match body.as_object_mut() {
            Some(obj) => obj,
            None => return body,
        };

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                        "strict": t.strict,
                    })
                })
                .collect();
            obj.insert("tools".into(), Value::Array(tools));
        }
        if let Some(temperature) = request.temperature {
            obj.insert("temperature".into(), json!(temperature));
        }
        if let OutputFormat::JsonSchema { .. } = request.text_format {
            obj.insert("text".into(), json!({ "format": request.text_format }));
        }
        if let Some(effort) = request.reasoning_effort {
            obj.insert("reasoning".into(), json!({ "effort": effort }));
        }
        if let Some(ref key) = request.prompt_cache_key {
            obj.insert("prompt_cache_key".into(), json!(key));
        }
        if let Some(ref user) = request.user {
            obj.insert("user".into(), json!(user));
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, StrandError> {
        let url = format!("{}/responses", self.base_url);
        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ModelTransport for OpenAiResponsesTransport {
    fn name(&self) -> &str {
        "openai-responses"
    }

    async fn create(&self, request: &ModelRequest) -> Result<ModelResponse, StrandError> {
        let body = self.build_request_body(request, false);
        debug!(model = request.model.as_str(), "OpenAI Responses create");

        let data: Value = self.post(&body).await?.json().await?;
        if let Some(message) = data
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return Err(StrandError::Transport(message.to_string()));
        }
        Ok(parse_response(&data))
    }

    async fn stream(&self, request: &ModelRequest) -> Result<EventStream, StrandError> {
        let body = self.build_request_body(request, true);
        debug!(model = request.model.as_str(), "OpenAI Responses stream");

        let byte_stream = self.post(&body).await?.bytes_stream();

        let stream = async_stream::stream! {
            let mut sse = SseBuffer::new();
            futures::pin_mut!(byte_stream);

            'read: while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(StrandError::Network(e));
                        return;
                    }
                };
                for data in sse.push(&chunk) {
                    if data == "[DONE]" {
                        break 'read;
                    }
                    match decode_event(&data) {
                        Ok(Some(event)) => {
                            let terminal = matches!(
                                event,
                                StreamEvent::Completed { .. } | StreamEvent::Failed { .. }
                            );
                            yield Ok(event);
                            if terminal {
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            if let Some(data) = sse.finish() {
                if let Ok(Some(event)) = decode_event(&data) {
                    yield Ok(event);
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

fn decode_event(data: &str) -> Result<Option<StreamEvent>, StrandError> {
    let event: Value = serde_json::from_str(data)
        .map_err(|e| StrandError::StreamingFailed(format!("malformed stream event: {e}")))?;
    Ok(map_event(&event))
}

/// Translate one wire event. Unknown and non-item events map to `None`.
fn map_event(event: &Value) -> Option<StreamEvent> {
    let index = || event.get("output_index").and_then(Value::as_u64).unwrap_or(0) as usize;
    let text = |key: &str| {
        event
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match event.get("type").and_then(Value::as_str)? {
        "response.created" => Some(StreamEvent::Created {
            response_id: event
                .pointer("/response/id")
                .and_then(Value::as_str)
                .map(String::from),
        }),
        "response.output_item.added" => Some(StreamEvent::OutputItemAdded {
            output_index: index(),
            item: parse_item(event.get("item")?)?,
        }),
        "response.output_item.done" => Some(StreamEvent::OutputItemDone {
            output_index: index(),
            item: parse_item(event.get("item")?)?,
        }),
        "response.output_text.delta" => Some(StreamEvent::OutputTextDelta {
            output_index: index(),
            delta: text("delta"),
        }),
        "response.output_text.done" => Some(StreamEvent::OutputTextDone {
            output_index: index(),
            text: text("text"),
        }),
        "response.refusal.delta" => Some(StreamEvent::RefusalDelta {
            output_index: index(),
            delta: text("delta"),
        }),
        "response.function_call_arguments.delta" => Some(StreamEvent::FunctionCallArgumentsDelta {
            output_index: index(),
            delta: text("delta"),
        }),
        "response.function_call_arguments.done" => Some(StreamEvent::FunctionCallArgumentsDone {
            output_index: index(),
            arguments: text("arguments"),
        }),
        "response.completed" | "response.incomplete" => Some(StreamEvent::Completed {
            response: parse_response(event.get("response")?),
        }),
        "response.failed" => Some(StreamEvent::Failed {
            message: event
                .pointer("/response/error/message")
                .and_then(Value::as_str)
                .unwrap_or("response failed")
                .to_string(),
        }),
        "error" => Some(StreamEvent::Failed {
            message: event
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("stream error")
                .to_string(),
        }),
        other => {
            debug!(event_type = other, "ignoring OpenAI Responses event");
            None
        }
    }
}

/// Parse a response object. Output items of kinds the engine does not model
/// (reasoning summaries, web search calls) are skipped.
fn parse_response(data: &Value) -> ModelResponse {
    let output = data
        .get("output")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_item).collect())
        .unwrap_or_default();

    ModelResponse {
        id: data.get("id").and_then(Value::as_str).map(String::from),
        output,
        usage: data.get("usage").map(parse_usage),
    }
}

fn parse_item(value: &Value) -> Option<Item> {
    match serde_json::from_value::<Item>(value.clone()) {
        Ok(item) => Some(item),
        Err(e) => {
            let item_type = value
                .get("type")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("?");
            debug!(item_type, error = %e, "skipping output item");
            None
        }
    }
}

fn parse_usage(usage: &Value) -> Usage {
    let count = |ptr: &str| usage.pointer(ptr).and_then(Value::as_u64).map(|v| v as u32);
    Usage {
        input_tokens: count("/input_tokens").unwrap_or(0),
        output_tokens: count("/output_tokens").unwrap_or(0),
        total_tokens: count("/total_tokens").unwrap_or(0),
        cached_tokens: count("/input_tokens_details/cached_tokens"),
        reasoning_tokens: count("/output_tokens_details/reasoning_tokens"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolDefinition;
    use crate::types::ReasoningEffort;

    #[test]
    fn request_body_carries_directives() {
        let transport = OpenAiResponsesTransport::new("sk-test");
        let mut request = ModelRequest::new("gpt-4.1", "be brief", vec![Item::user("hi")]);
        request.tools.push(ToolDefinition {
            name: "lookup".into(),
            description: "Look things up".into(),
            parameters: json!({ "type": "object", "properties": {} }),
            strict: false,
        });
        request.temperature = Some(0.2);
        request.reasoning_effort = Some(ReasoningEffort::Low);
        request.prompt_cache_key = Some("abc".into());
        request.text_format = OutputFormat::JsonSchema {
            name: "answer".into(),
            description: None,
            schema: json!({ "type": "object" }),
            strict: true,
        };

        let body = transport.build_request_body(&request, true);

        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["instructions"], json!("be brief"));
        assert_eq!(body["input"][0]["content"][0]["type"], json!("input_text"));
        assert_eq!(body["tools"][0]["type"], json!("function"));
        assert_eq!(body["text"]["format"]["type"], json!("json_schema"));
        assert_eq!(body["text"]["format"]["strict"], json!(true));
        assert_eq!(body["reasoning"]["effort"], json!("low"));
        assert_eq!(body["prompt_cache_key"], json!("abc"));
        assert_eq!(body["truncation"], json!("auto"));
    }

    #[test]
    fn plain_text_requests_omit_text_format() {
        let transport = OpenAiResponsesTransport::new("sk-test");
        let request = ModelRequest::new("gpt-4.1", "", vec![]);
        let body = transport.build_request_body(&request, false);
        assert!(body.get("text").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn parses_response_and_skips_unknown_items() {
        let response = parse_response(&json!({
            "id": "resp_1",
            "output": [
                { "type": "reasoning", "id": "rs_1", "summary": [] },
                { "type": "function_call", "id": "fc_1", "call_id": "call_1",
                  "name": "lookup", "arguments": "{}", "status": "completed" },
            ],
            "usage": {
                "input_tokens": 10, "output_tokens": 4, "total_tokens": 14,
                "input_tokens_details": { "cached_tokens": 8 }
            }
        }));

        assert_eq!(response.id.as_deref(), Some("resp_1"));
        assert_eq!(response.output.len(), 1);
        assert_eq!(response.function_calls()[0].name, "lookup");
        let usage = response.usage.unwrap();
        assert_eq!(usage.total_tokens, 14);
        assert_eq!(usage.cached_tokens, Some(8));
        assert_eq!(usage.reasoning_tokens, None);
    }

    #[test]
    fn maps_wire_events() {
        let delta = map_event(&json!({
            "type": "response.output_text.delta", "output_index": 2, "delta": "he"
        }));
        assert_eq!(
            delta,
            Some(StreamEvent::OutputTextDelta { output_index: 2, delta: "he".into() })
        );

        let failed = map_event(&json!({
            "type": "response.failed",
            "response": { "error": { "message": "overloaded" } }
        }));
        assert_eq!(failed, Some(StreamEvent::Failed { message: "overloaded".into() }));

        assert_eq!(map_event(&json!({ "type": "response.in_progress" })), None);
    }
}
